//! In-memory query executor.
//!
//! [`InMemoryExecutor`] keeps every entity's rows in a `Vec` behind one
//! `tokio::sync::RwLock`. Reads share the lock; each write holds it for the
//! whole operation and builds its result on a copy, so a failed batch or a
//! conflicting update never leaves partial changes behind.
//!
//! Filters are evaluated with [`FilterSet::matcher`], which follows SQL NULL
//! semantics, and uniqueness follows SQL as well: a group containing a NULL
//! never collides.

use std::collections::HashMap;

use quickcrud_core::{CrudError, CrudResult};
use quickcrud_db::executor::{complete_insert_row, primary_key_cmp};
use quickcrud_db::query::{FilterSet, PaginationSpec};
use quickcrud_db::{EntitySchema, FindResult, QueryExecutor, Row, UpdateMode, Value};
use tokio::sync::RwLock;

/// Rows and autoincrement counters of one entity.
#[derive(Debug, Default, Clone)]
struct Table {
    rows: Vec<Row>,
    /// Highest value ever used per autoincrement column.
    sequences: HashMap<String, i64>,
}

/// A [`QueryExecutor`] that stores rows in process memory.
///
/// # Examples
///
/// ```
/// use quickcrud_db::{ColumnSpec, EntitySchema, QueryExecutor, Row, SemanticType};
/// use quickcrud_db::query::{FilterSet, PaginationSpec};
/// use quickcrud_db_backends::InMemoryExecutor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let schema = EntitySchema::new(
///     "t",
///     vec![ColumnSpec::new("id", SemanticType::Int64).primary_key().autoincrement()],
///     vec![],
/// )
/// .unwrap();
/// let executor = InMemoryExecutor::new();
/// executor.insert_many(&schema, vec![Row::new(), Row::new()]).await.unwrap();
/// let found = executor
///     .find(&schema, &FilterSet::new(), &PaginationSpec::default())
///     .await
///     .unwrap();
/// assert_eq!(found.total, 2);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryExecutor {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryExecutor {
    /// Creates an empty executor.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl QueryExecutor for InMemoryExecutor {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn ensure_entity(&self, schema: &EntitySchema) -> CrudResult<()> {
        self.tables
            .write()
            .await
            .entry(schema.name().to_string())
            .or_default();
        Ok(())
    }

    async fn find(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        page: &PaginationSpec,
    ) -> CrudResult<FindResult> {
        let matcher = filters.matcher()?;
        let tables = self.tables.read().await;
        let Some(table) = tables.get(schema.name()) else {
            return Ok(FindResult::default());
        };

        let mut matched: Vec<&Row> = table.rows.iter().filter(|row| matcher.matches(row)).collect();
        let order = page.effective_order(schema);
        matched.sort_by(|a, b| {
            order
                .iter()
                .map(|o| {
                    let left = a.get(&o.column).unwrap_or(&Value::Null);
                    let right = b.get(&o.column).unwrap_or(&Value::Null);
                    let ord = left.sort_cmp(right);
                    if o.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = page
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let rows = matched.into_iter().skip(offset).take(limit).cloned().collect();
        tracing::trace!(entity = schema.name(), total, "Scanned in-memory table");
        Ok(FindResult { total, rows })
    }

    async fn insert_many(&self, schema: &EntitySchema, rows: Vec<Row>) -> CrudResult<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(schema.name().to_string()).or_default();
        let mut sequences = table.sequences.clone();
        let mut staged: Vec<Row> = Vec::with_capacity(rows.len());

        for row in &rows {
            let mut full = complete_insert_row(schema, row)?;
            for column in schema.columns().iter().filter(|c| c.autoincrement) {
                let counter = sequences.entry(column.name.clone()).or_insert(0);
                match full.get(&column.name).and_then(Value::as_int) {
                    Some(explicit) => *counter = (*counter).max(explicit),
                    None => {
                        *counter = counter.checked_add(1).ok_or_else(|| {
                            CrudError::DatabaseError(format!(
                                "autoincrement sequence exhausted for {}.{}",
                                schema.name(),
                                column.name
                            ))
                        })?;
                        full.set(&column.name, *counter);
                    }
                }
            }
            let full = in_schema_order(schema, &full);
            check_not_null(schema, &full)?;
            if let Some(name) = find_collision(schema, &full, table.rows.iter().chain(&staged)) {
                return Err(conflict(name));
            }
            staged.push(full);
        }

        table.rows.extend(staged.iter().cloned());
        table.sequences = sequences;
        tracing::debug!(entity = schema.name(), count = staged.len(), "Inserted in-memory rows");
        Ok(staged)
    }

    async fn update_matching(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        values: &Row,
        mode: UpdateMode,
    ) -> CrudResult<Vec<Row>> {
        let assignments = mode.assignments(schema, values)?;
        let matcher = filters.matcher()?;
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(schema.name()) else {
            return Ok(Vec::new());
        };

        let mut next = table.rows.clone();
        let mut changed = Vec::new();
        for (idx, row) in next.iter_mut().enumerate() {
            if matcher.matches(row) {
                row.merge(&assignments);
                check_not_null(schema, row)?;
                changed.push(idx);
            }
        }

        for &idx in &changed {
            let others = next
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != idx)
                .map(|(_, row)| row);
            if let Some(name) = find_collision(schema, &next[idx], others) {
                return Err(conflict(name));
            }
        }

        let mut updated: Vec<Row> = changed.iter().map(|&idx| next[idx].clone()).collect();
        table.rows = next;
        updated.sort_by(|a, b| primary_key_cmp(schema, a, b));
        tracing::debug!(entity = schema.name(), count = updated.len(), "Updated in-memory rows");
        Ok(updated)
    }

    async fn delete_matching(&self, schema: &EntitySchema, filters: &FilterSet) -> CrudResult<Vec<Row>> {
        let matcher = filters.matcher()?;
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(schema.name()) else {
            return Ok(Vec::new());
        };

        let (mut deleted, kept): (Vec<Row>, Vec<Row>) =
            table.rows.drain(..).partition(|row| matcher.matches(row));
        table.rows = kept;
        deleted.sort_by(|a, b| primary_key_cmp(schema, a, b));
        tracing::debug!(entity = schema.name(), count = deleted.len(), "Deleted in-memory rows");
        Ok(deleted)
    }
}

fn in_schema_order(schema: &EntitySchema, row: &Row) -> Row {
    Row::from_pairs(schema.columns().iter().map(|c| {
        (
            c.name.clone(),
            row.get(&c.name).cloned().unwrap_or(Value::Null),
        )
    }))
}

fn check_not_null(schema: &EntitySchema, row: &Row) -> CrudResult<()> {
    for column in schema.columns().iter().filter(|c| !c.nullable) {
        if row.get(&column.name).map_or(true, Value::is_null) {
            return Err(CrudError::DatabaseError(format!(
                "NOT NULL constraint failed: {}.{}",
                schema.name(),
                column.name
            )));
        }
    }
    Ok(())
}

/// Returns the name of the first uniqueness group `row` shares with any of
/// `others`.
fn find_collision<'s, 'r>(
    schema: &'s EntitySchema,
    row: &Row,
    others: impl Iterator<Item = &'r Row> + Clone,
) -> Option<&'s str> {
    schema
        .uniqueness_groups()
        .iter()
        .find(|group| others.clone().any(|other| group.collides(row, other)))
        .map(|group| group.name())
}

fn conflict(constraint: &str) -> CrudError {
    CrudError::Conflict(format!(
        "duplicate key value violates unique constraint \"{constraint}\""
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcrud_db::query::{FilterClause, ListOp, OrderBy, Predicate};
    use quickcrud_db::{ColumnSpec, SemanticType, UniqueConstraint};

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("id", SemanticType::Int64).primary_key().autoincrement(),
                ColumnSpec::new("code", SemanticType::String).unique(),
                ColumnSpec::new("a", SemanticType::Int32).nullable(),
                ColumnSpec::new("b", SemanticType::Int32).nullable(),
                ColumnSpec::new("n", SemanticType::Int32).default(0),
            ],
            vec![UniqueConstraint::new("uq_ab", vec!["a".into(), "b".into()])],
        )
        .unwrap()
    }

    fn row(code: &str) -> Row {
        Row::from_pairs([("code", code)])
    }

    async fn all(executor: &InMemoryExecutor, schema: &EntitySchema) -> Vec<Row> {
        executor
            .find(schema, &FilterSet::new(), &PaginationSpec::default())
            .await
            .unwrap()
            .rows
    }

    #[tokio::test]
    async fn test_insert_fills_keys_and_defaults() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        let rows = executor
            .insert_many(&schema, vec![row("x"), row("y")])
            .await
            .unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(rows[1].get("id"), Some(&Value::Int(2)));
        assert_eq!(rows[0].get("n"), Some(&Value::Int(0)));
        assert_eq!(rows[0].get("a"), Some(&Value::Null));
        assert_eq!(rows[0].columns(), ["id", "code", "a", "b", "n"]);
    }

    #[tokio::test]
    async fn test_sequence_skips_past_explicit_keys() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        let mut explicit = row("x");
        explicit.set("id", 10);
        executor.insert_many(&schema, vec![explicit]).await.unwrap();
        let rows = executor.insert_many(&schema, vec![row("y")]).await.unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Int(11)));
    }

    #[tokio::test]
    async fn test_exhausted_sequence_is_an_error() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        let mut explicit = row("x");
        explicit.set("id", i64::MAX);
        executor.insert_many(&schema, vec![explicit]).await.unwrap();

        let err = executor.insert_many(&schema, vec![row("y")]).await.unwrap_err();
        assert!(matches!(err, CrudError::DatabaseError(ref m) if m.contains("exhausted")));
        assert_eq!(all(&executor, &schema).await.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_conflict_is_atomic() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        executor.insert_many(&schema, vec![row("x")]).await.unwrap();

        let err = executor
            .insert_many(&schema, vec![row("y"), row("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, CrudError::Conflict(_)));
        assert_eq!(all(&executor, &schema).await.len(), 1);

        let err = executor
            .insert_many(&schema, vec![row("z"), row("z")])
            .await
            .unwrap_err();
        assert!(matches!(err, CrudError::Conflict(_)));
        assert_eq!(all(&executor, &schema).await.len(), 1);

        // The failed batches did not consume sequence values.
        let rows = executor.insert_many(&schema, vec![row("w")]).await.unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Int(2)));
    }

    #[tokio::test]
    async fn test_composite_unique_ignores_nulls() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        let mut first = row("x");
        first.set("a", 1);
        let mut second = row("y");
        second.set("a", 1);
        executor.insert_many(&schema, vec![first, second]).await.unwrap();

        let mut third = row("z");
        third.set("a", 1);
        third.set("b", 2);
        let mut fourth = row("w");
        fourth.set("a", 1);
        fourth.set("b", 2);
        let err = executor.insert_many(&schema, vec![third, fourth]).await.unwrap_err();
        assert!(err.to_string().contains("uq_ab"));
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_data_unchanged() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        executor.insert_many(&schema, vec![row("x"), row("y")]).await.unwrap();

        let mut filters = FilterSet::new();
        filters.insert(FilterClause::equals("id", SemanticType::Int64, Value::Int(2)));
        let err = executor
            .update_matching(&schema, &filters, &row("x"), UpdateMode::Patch)
            .await
            .unwrap_err();
        assert!(matches!(err, CrudError::Conflict(_)));
        assert_eq!(all(&executor, &schema).await[1].get("code"), Some(&Value::from("y")));
    }

    #[tokio::test]
    async fn test_replace_resets_defaults() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        let mut original = row("x");
        original.set("n", 7);
        original.set("a", 3);
        executor.insert_many(&schema, vec![original]).await.unwrap();

        let updated = executor
            .update_matching(&schema, &FilterSet::new(), &row("x2"), UpdateMode::Replace)
            .await
            .unwrap();
        assert_eq!(updated[0].get("n"), Some(&Value::Int(0)));
        assert_eq!(updated[0].get("a"), Some(&Value::Null));
        assert_eq!(updated[0].get("code"), Some(&Value::from("x2")));
    }

    #[tokio::test]
    async fn test_delete_returns_snapshot_in_key_order() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        executor
            .insert_many(&schema, vec![row("x"), row("y"), row("z")])
            .await
            .unwrap();
        let mut filters = FilterSet::new();
        filters.insert(FilterClause::new(
            "code",
            SemanticType::String,
            Predicate::List {
                op: ListOp::NotIn,
                values: vec![Value::from("y")],
            },
        ));
        let deleted = executor.delete_matching(&schema, &filters).await.unwrap();
        let ids: Vec<_> = deleted.iter().map(|r| r.get("id").cloned()).collect();
        assert_eq!(ids, vec![Some(Value::Int(1)), Some(Value::Int(3))]);
        assert_eq!(all(&executor, &schema).await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_orders_and_paginates() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        let mut rows = Vec::new();
        for (code, n) in [("a", 2), ("b", 1), ("c", 2)] {
            let mut r = row(code);
            r.set("n", n);
            rows.push(r);
        }
        executor.insert_many(&schema, rows).await.unwrap();

        let page = PaginationSpec::default()
            .order(OrderBy::desc("n"))
            .with_limit(2)
            .with_offset(1);
        let found = executor.find(&schema, &FilterSet::new(), &page).await.unwrap();
        assert_eq!(found.total, 3);
        let codes: Vec<_> = found.rows.iter().map(|r| r.get("code").cloned()).collect();
        assert_eq!(codes, vec![Some(Value::from("c")), Some(Value::from("b"))]);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let executor = InMemoryExecutor::new();
        let schema = schema();
        assert_eq!(all(&executor, &schema).await.len(), 0);
        let deleted = executor.delete_matching(&schema, &FilterSet::new()).await.unwrap();
        assert!(deleted.is_empty());
    }
}
