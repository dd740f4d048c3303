//! SQLite query executor using `rusqlite`.
//!
//! [`SqliteExecutor`] renders statements with
//! [`SqlCompiler`](quickcrud_db::SqlCompiler) and runs them on one
//! connection behind a `tokio::sync::Mutex`, inside
//! `tokio::task::spawn_blocking`. Every write runs in a transaction and reads
//! its rows back through `RETURNING`.
//!
//! Storage encodings:
//! - booleans and integers as INTEGER, floats as REAL, binary as BLOB
//! - dates, times, and timestamps as fixed-width ISO 8601 TEXT, so text
//!   order is chronological order
//! - zoned times and timestamps normalized to UTC (`...Z`)

use std::path::PathBuf;
use std::sync::Arc;

use quickcrud_core::{CrudError, CrudResult};
use quickcrud_db::executor::{complete_insert_row, primary_key_cmp};
use quickcrud_db::query::{FilterSet, PaginationSpec};
use quickcrud_db::value::utc_time_of_day;
use quickcrud_db::{
    Dialect, EntitySchema, FindResult, QueryExecutor, Row, SemanticType, SqlCompiler, UpdateMode,
    Value,
};
use rusqlite::types::ValueRef;
use tokio::sync::Mutex;

const TIME_FORMAT: &str = "%H:%M:%S%.6f";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A [`QueryExecutor`] backed by SQLite.
///
/// WAL journal mode is enabled for file databases. `:memory:` opens a
/// private in-memory database, which is handy for tests.
pub struct SqliteExecutor {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor").field("path", &self.path).finish()
    }
}

impl SqliteExecutor {
    /// Opens a SQLite database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::OperationalError`] if the database cannot be
    /// opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> CrudResult<Self> {
        let path = path.into();
        let in_memory = path.to_str() == Some(":memory:");
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| CrudError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| CrudError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database.
    pub fn memory() -> CrudResult<Self> {
        Self::open(":memory:")
    }

    /// Returns the database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    const fn compiler() -> SqlCompiler {
        SqlCompiler::new(Dialect::Sqlite)
    }

    /// Runs `f` on the connection in a blocking task.
    async fn with_connection<T, F>(&self, f: F) -> CrudResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> CrudResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| CrudError::DatabaseError(format!("Task join error: {e}")))?
    }

    /// Runs a write statement in a transaction and returns its rows in
    /// primary-key order.
    async fn write_returning(
        &self,
        schema: &EntitySchema,
        sql: String,
        params: Vec<Value>,
    ) -> CrudResult<Vec<Row>> {
        let schema = schema.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_error)?;
            let mut rows = query_rows(&tx, &schema, &sql, &params)?;
            tx.commit().map_err(map_error)?;
            rows.sort_by(|a, b| primary_key_cmp(&schema, a, b));
            Ok(rows)
        })
        .await
    }
}

#[async_trait::async_trait]
impl QueryExecutor for SqliteExecutor {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_entity(&self, schema: &EntitySchema) -> CrudResult<()> {
        let sql = Self::compiler().compile_create_table(schema)?;
        tracing::debug!(sql = %sql, "Creating table");
        self.with_connection(move |conn| {
            conn.execute(&sql, []).map_err(map_error)?;
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        page: &PaginationSpec,
    ) -> CrudResult<FindResult> {
        let compiler = Self::compiler();
        let (count_sql, count_params) = compiler.compile_count(schema, filters);
        let (select_sql, select_params) = compiler.compile_select(schema, filters, page);
        tracing::trace!(sql = %select_sql, params = select_params.len(), "SQLite find");

        let schema = schema.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_error)?;
            let total = query_count(&tx, &count_sql, &count_params)?;
            let rows = query_rows(&tx, &schema, &select_sql, &select_params)?;
            tx.commit().map_err(map_error)?;
            Ok(FindResult { total, rows })
        })
        .await
    }

    async fn insert_many(&self, schema: &EntitySchema, rows: Vec<Row>) -> CrudResult<Vec<Row>> {
        let compiler = Self::compiler();
        let statements = rows
            .iter()
            .map(|row| complete_insert_row(schema, row).map(|full| compiler.compile_insert(schema, &full)))
            .collect::<CrudResult<Vec<_>>>()?;

        let schema = schema.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_error)?;
            let mut inserted = Vec::with_capacity(statements.len());
            for (sql, params) in &statements {
                tracing::trace!(sql = %sql, "SQLite insert");
                inserted.extend(query_rows(&tx, &schema, sql, params)?);
            }
            tx.commit().map_err(map_error)?;
            Ok(inserted)
        })
        .await
    }

    async fn update_matching(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        values: &Row,
        mode: UpdateMode,
    ) -> CrudResult<Vec<Row>> {
        let assignments = mode.assignments(schema, values)?;
        let (sql, params) = Self::compiler().compile_update(schema, filters, &assignments)?;
        tracing::trace!(sql = %sql, "SQLite update");
        self.write_returning(schema, sql, params).await
    }

    async fn delete_matching(&self, schema: &EntitySchema, filters: &FilterSet) -> CrudResult<Vec<Row>> {
        let (sql, params) = Self::compiler().compile_delete(schema, filters);
        tracing::trace!(sql = %sql, "SQLite delete");
        self.write_returning(schema, sql, params).await
    }
}

/// Binds values to a statement using the storage encodings.
fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> CrudResult<()> {
    for (i, param) in params.iter().enumerate() {
        let idx = i + 1;
        match param {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
            Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
            Value::Int(v) => stmt.raw_bind_parameter(idx, v),
            Value::Float(v) => stmt.raw_bind_parameter(idx, v),
            Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
            Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
            Value::Date(d) => stmt.raw_bind_parameter(idx, d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => stmt.raw_bind_parameter(idx, t.format(TIME_FORMAT).to_string()),
            Value::TimeTz(t, offset) => {
                let utc = utc_time_of_day(*t, *offset);
                stmt.raw_bind_parameter(idx, format!("{}Z", utc.format(TIME_FORMAT)))
            }
            Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.format(DATETIME_FORMAT).to_string()),
            Value::DateTimeTz(dt) => {
                stmt.raw_bind_parameter(idx, format!("{}Z", dt.format(DATETIME_FORMAT)))
            }
        }
        .map_err(|e| CrudError::DatabaseError(format!("Bind error: {e}")))?;
    }
    Ok(())
}

/// Decodes one stored cell as the column's semantic type.
fn decode_cell(value: ValueRef<'_>, ty: SemanticType) -> CrudResult<Value> {
    let decoded = match value {
        ValueRef::Null => Some(Value::Null),
        ValueRef::Integer(i) if ty == SemanticType::Boolean => Some(Value::Bool(i != 0)),
        ValueRef::Integer(i) if ty.is_integer() => Some(Value::Int(i)),
        ValueRef::Integer(i) if ty.is_numeric() => Some(Value::Float(i as f64)),
        ValueRef::Real(f) if ty.is_numeric() => Some(Value::Float(f)),
        ValueRef::Blob(b) if ty == SemanticType::Binary => Some(Value::Bytes(b.to_vec())),
        ValueRef::Text(b) => {
            let text = String::from_utf8_lossy(b);
            if ty.is_textual() {
                Some(Value::String(text.into_owned()))
            } else {
                Value::parse_literal(&text, ty)
            }
        }
        _ => None,
    };
    decoded.ok_or_else(|| {
        CrudError::DatabaseError(format!("Stored value does not decode as {ty}"))
    })
}

/// Runs a row-returning statement and decodes rows by schema column order.
fn query_rows(
    conn: &rusqlite::Connection,
    schema: &EntitySchema,
    sql: &str,
    params: &[Value],
) -> CrudResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(map_error)?;
    bind_params(&mut stmt, params)?;

    let mut raw_rows = stmt.raw_query();
    let mut rows = Vec::new();
    while let Some(raw) = raw_rows.next().map_err(map_error)? {
        let mut row = Row::new();
        for (i, column) in schema.columns().iter().enumerate() {
            let cell = raw.get_ref(i).map_err(map_error)?;
            row.set(&column.name, decode_cell(cell, column.semantic_type)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn query_count(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> CrudResult<u64> {
    let mut stmt = conn.prepare(sql).map_err(map_error)?;
    bind_params(&mut stmt, params)?;
    let mut raw_rows = stmt.raw_query();
    match raw_rows.next().map_err(map_error)? {
        Some(raw) => {
            let count: i64 = raw.get(0).map_err(map_error)?;
            Ok(count as u64)
        }
        None => Ok(0),
    }
}

/// Maps uniqueness violations to [`CrudError::Conflict`].
fn map_error(e: rusqlite::Error) -> CrudError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &e {
        let unique = matches!(
            failure.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        );
        if unique {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            return CrudError::Conflict(detail);
        }
    }
    CrudError::DatabaseError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
    use quickcrud_db::query::{FilterClause, ListOp, MatchMode, Predicate};
    use quickcrud_db::ColumnSpec;

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("id", SemanticType::Int64).primary_key().autoincrement(),
                ColumnSpec::new("code", SemanticType::String).unique(),
                ColumnSpec::new("flag", SemanticType::Boolean).default(false),
                ColumnSpec::new("ratio", SemanticType::Float64).nullable(),
                ColumnSpec::new("blob", SemanticType::Binary).nullable(),
                ColumnSpec::new("day", SemanticType::Date).nullable(),
                ColumnSpec::new("at", SemanticType::TimestampTz).nullable(),
                ColumnSpec::new("tz", SemanticType::TimeTz).nullable(),
            ],
            vec![],
        )
        .unwrap()
    }

    async fn executor() -> SqliteExecutor {
        let executor = SqliteExecutor::memory().unwrap();
        executor.ensure_entity(&schema()).await.unwrap();
        executor
    }

    fn row(code: &str) -> Row {
        Row::from_pairs([("code", code)])
    }

    fn code_filter(mode: MatchMode, pattern: &str) -> FilterSet {
        let mut filters = FilterSet::new();
        filters.insert(FilterClause::new(
            "code",
            SemanticType::String,
            Predicate::Match {
                mode,
                patterns: vec![pattern.to_string()],
            },
        ));
        filters
    }

    #[tokio::test]
    async fn test_insert_and_round_trip_types() {
        let executor = executor().await;
        let schema = schema();
        let mut full = row("a");
        full.set("flag", true);
        full.set("ratio", 0.5);
        full.set("blob", vec![1u8, 2, 3]);
        full.set("day", NaiveDate::from_ymd_opt(2021, 7, 22).unwrap());
        full.set("at", Utc.with_ymd_and_hms(2021, 7, 22, 14, 10, 26).unwrap());
        full.set(
            "tz",
            Value::TimeTz(
                NaiveTime::from_hms_opt(18, 18, 18).unwrap(),
                FixedOffset::east_opt(2 * 3600).unwrap(),
            ),
        );

        let inserted = executor.insert_many(&schema, vec![full, row("b")]).await.unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(inserted[0].get("flag"), Some(&Value::Bool(true)));
        assert_eq!(inserted[0].get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(inserted[0].get("blob"), Some(&Value::Bytes(vec![1, 2, 3])));
        assert_eq!(
            inserted[0].get("tz"),
            Some(&Value::TimeTz(
                NaiveTime::from_hms_opt(16, 18, 18).unwrap(),
                FixedOffset::east_opt(0).unwrap()
            ))
        );
        assert_eq!(inserted[1].get("flag"), Some(&Value::Bool(false)));
        assert_eq!(inserted[1].get("day"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_conflict_rolls_back_batch() {
        let executor = executor().await;
        let schema = schema();
        executor.insert_many(&schema, vec![row("a")]).await.unwrap();

        let err = executor
            .insert_many(&schema, vec![row("b"), row("a")])
            .await
            .unwrap_err();
        assert!(matches!(err, CrudError::Conflict(_)), "{err}");

        let found = executor
            .find(&schema, &FilterSet::new(), &PaginationSpec::default())
            .await
            .unwrap();
        assert_eq!(found.total, 1);
    }

    #[tokio::test]
    async fn test_string_match_case_sensitivity() {
        let executor = executor().await;
        let schema = schema();
        executor
            .insert_many(&schema, vec![row("Alpha"), row("alpine"), row("beta")])
            .await
            .unwrap();

        let page = PaginationSpec::default();
        let found = executor
            .find(&schema, &code_filter(MatchMode::CaseSensitive, "al%"), &page)
            .await
            .unwrap();
        assert_eq!(found.total, 1);

        let found = executor
            .find(&schema, &code_filter(MatchMode::CaseInsensitive, "al%"), &page)
            .await
            .unwrap();
        assert_eq!(found.total, 2);

        let found = executor
            .find(&schema, &code_filter(MatchMode::NotCaseInsensitive, "al%"), &page)
            .await
            .unwrap();
        assert_eq!(found.total, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_return_rows() {
        let executor = executor().await;
        let schema = schema();
        executor
            .insert_many(&schema, vec![row("a"), row("b"), row("c")])
            .await
            .unwrap();

        let patch = Row::from_pairs([("ratio", 1.5)]);
        let updated = executor
            .update_matching(&schema, &FilterSet::new(), &patch, UpdateMode::Patch)
            .await
            .unwrap();
        assert_eq!(updated.len(), 3);
        assert!(updated.iter().all(|r| r.get("ratio") == Some(&Value::Float(1.5))));
        assert_eq!(updated[0].get("code"), Some(&Value::from("a")));

        let mut filters = FilterSet::new();
        filters.insert(FilterClause::new(
            "id",
            SemanticType::Int64,
            Predicate::List {
                op: ListOp::In,
                values: vec![Value::Int(1), Value::Int(3)],
            },
        ));
        let deleted = executor.delete_matching(&schema, &filters).await.unwrap();
        assert_eq!(deleted.len(), 2);
        assert_eq!(deleted[1].get("code"), Some(&Value::from("c")));
    }

    #[tokio::test]
    async fn test_update_conflict_is_reported() {
        let executor = executor().await;
        let schema = schema();
        executor.insert_many(&schema, vec![row("a"), row("b")]).await.unwrap();
        let err = executor
            .update_matching(&schema, &FilterSet::new(), &row("z"), UpdateMode::Patch)
            .await
            .unwrap_err();
        assert!(matches!(err, CrudError::Conflict(_)), "{err}");
    }

    #[test]
    fn test_open_file_database() {
        let dir = std::env::temp_dir().join(format!("quickcrud-sqlite-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.db");
        let executor = SqliteExecutor::open(&path).unwrap();
        assert_eq!(executor.path(), &path);
        drop(executor);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
