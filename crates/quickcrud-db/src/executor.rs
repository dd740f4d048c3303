//! The storage boundary.
//!
//! [`QueryExecutor`] is the contract the mutation coordinator drives. The
//! coordinator validates everything before calling it, so executors only see
//! well-typed rows and compiled filters. Implementations live in the
//! `quickcrud-db-backends` crate.
//!
//! Every method is one atomic unit: a failed batch or a conflicting update
//! must leave storage unchanged.

use std::cmp::Ordering;

use quickcrud_core::{CrudError, CrudResult};

use crate::query::{FilterSet, PaginationSpec};
use crate::registry::EntitySchema;
use crate::row::Row;
use crate::value::Value;

/// One page of rows and the total match count.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct FindResult {
    /// Number of rows matching the filters, ignoring limit and offset.
    pub total: u64,
    /// The requested page.
    #[serde(rename = "result")]
    pub rows: Vec<Row>,
}

/// How [`QueryExecutor::update_matching`] treats columns absent from the
/// new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Absent non-key columns reset to their default, or NULL.
    Replace,
    /// Absent columns keep their current value.
    Patch,
}

impl UpdateMode {
    /// The assignments to apply for `values` under this mode, in schema
    /// column order. Key columns are never assigned.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::DatabaseError`] if a replace leaves a required
    /// column without a value.
    pub fn assignments(self, schema: &EntitySchema, values: &Row) -> CrudResult<Row> {
        let mut out = Row::new();
        for column in schema.columns().iter().filter(|c| !c.primary_key) {
            match (values.get(&column.name), self) {
                (Some(value), _) => out.set(&column.name, value.clone()),
                (None, Self::Patch) => {}
                (None, Self::Replace) => {
                    let fallback = column.replace_fallback().ok_or_else(|| {
                        CrudError::DatabaseError(format!(
                            "Replace of '{}' is missing required column '{}'",
                            schema.name(),
                            column.name
                        ))
                    })?;
                    out.set(&column.name, fallback);
                }
            }
        }
        Ok(out)
    }
}

/// Async storage contract for entity rows.
///
/// Rows returned by every method hold all schema columns in schema order.
/// Rows returned by writes are ordered by primary key ascending, except
/// [`insert_many`](Self::insert_many), which preserves input order.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// A short name for logs ("memory", "sqlite").
    fn engine(&self) -> &'static str;

    /// Prepares storage for a schema (creates the table if needed).
    async fn ensure_entity(&self, schema: &EntitySchema) -> CrudResult<()>;

    /// Returns one page of matching rows and the full match count.
    async fn find(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        page: &PaginationSpec,
    ) -> CrudResult<FindResult>;

    /// Inserts every row or none.
    ///
    /// Absent columns are filled from defaults or generated. Any collision
    /// with stored rows or within the batch fails with
    /// [`CrudError::Conflict`].
    async fn insert_many(&self, schema: &EntitySchema, rows: Vec<Row>) -> CrudResult<Vec<Row>>;

    /// Updates every matching row and returns the new rows.
    async fn update_matching(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        values: &Row,
        mode: UpdateMode,
    ) -> CrudResult<Vec<Row>>;

    /// Deletes every matching row and returns the rows as they were.
    async fn delete_matching(&self, schema: &EntitySchema, filters: &FilterSet) -> CrudResult<Vec<Row>>;
}

/// Completes an insert payload: supplied values, then defaults, then NULL
/// for nullable columns. Autoincrement columns left out stay out so storage
/// can generate them. The result is in schema column order.
///
/// # Errors
///
/// Returns [`CrudError::DatabaseError`] if a required column is missing.
pub fn complete_insert_row(schema: &EntitySchema, row: &Row) -> CrudResult<Row> {
    let mut out = Row::new();
    for column in schema.columns() {
        if let Some(value) = row.get(&column.name) {
            out.set(&column.name, value.clone());
        } else if let Some(default) = &column.default {
            out.set(&column.name, default.clone());
        } else if column.autoincrement {
            continue;
        } else if column.nullable {
            out.set(&column.name, Value::Null);
        } else {
            return Err(CrudError::DatabaseError(format!(
                "Insert into '{}' is missing required column '{}'",
                schema.name(),
                column.name
            )));
        }
    }
    Ok(out)
}

/// Compares two rows on their primary key columns.
pub fn primary_key_cmp(schema: &EntitySchema, a: &Row, b: &Row) -> Ordering {
    schema
        .primary_key_columns()
        .map(|pk| {
            let left = a.get(&pk.name).unwrap_or(&Value::Null);
            let right = b.get(&pk.name).unwrap_or(&Value::Null);
            left.sort_cmp(right)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{ColumnSpec, SemanticType};

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("id", SemanticType::Int64).primary_key().autoincrement(),
                ColumnSpec::new("name", SemanticType::String),
                ColumnSpec::new("note", SemanticType::String).nullable(),
                ColumnSpec::new("n", SemanticType::Int32).default(5),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_complete_insert_row() {
        let row = Row::from_pairs([("name", Value::from("a"))]);
        let done = complete_insert_row(&schema(), &row).unwrap();
        assert_eq!(done.columns(), ["name", "note", "n"]);
        assert_eq!(done.get("note"), Some(&Value::Null));
        assert_eq!(done.get("n"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_complete_insert_row_keeps_explicit_key() {
        let row = Row::from_pairs([("n", Value::Int(1)), ("id", Value::Int(9)), ("name", Value::from("a"))]);
        let done = complete_insert_row(&schema(), &row).unwrap();
        assert_eq!(done.columns(), ["id", "name", "note", "n"]);
        assert_eq!(done.get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_complete_insert_row_missing_required() {
        assert!(complete_insert_row(&schema(), &Row::new()).is_err());
    }

    #[test]
    fn test_replace_assignments_reset_absent_columns() {
        let values = Row::from_pairs([("name", Value::from("b"))]);
        let set = UpdateMode::Replace.assignments(&schema(), &values).unwrap();
        assert_eq!(set.columns(), ["name", "note", "n"]);
        assert_eq!(set.get("note"), Some(&Value::Null));
        assert_eq!(set.get("n"), Some(&Value::Int(5)));
        assert!(UpdateMode::Replace.assignments(&schema(), &Row::new()).is_err());
    }

    #[test]
    fn test_patch_assignments_only_listed() {
        let values = Row::from_pairs([("note", Value::from("x")), ("id", Value::Int(3))]);
        let set = UpdateMode::Patch.assignments(&schema(), &values).unwrap();
        assert_eq!(set.columns(), ["note"]);
    }

    #[test]
    fn test_primary_key_cmp() {
        let a = Row::from_pairs([("id", 1)]);
        let b = Row::from_pairs([("id", 2)]);
        assert_eq!(primary_key_cmp(&schema(), &a, &b), Ordering::Less);
        assert_eq!(primary_key_cmp(&schema(), &b, &b), Ordering::Equal);
    }

    #[test]
    fn test_find_result_serializes_as_envelope() {
        let result = FindResult {
            total: 3,
            rows: vec![Row::from_pairs([("id", 1)])],
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"total": 3, "result": [{"id": 1}]})
        );
    }
}
