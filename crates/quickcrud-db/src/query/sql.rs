//! SQL rendering for filter sets.
//!
//! [`SqlCompiler`] turns a [`FilterSet`] and a [`PaginationSpec`] into
//! parameterized SQL for a [`Dialect`]. PostgreSQL uses `$1, $2, ...`
//! placeholders; SQLite uses `?`. Operands are always bound, never inlined;
//! only limit and offset (validated integers) are written into the text.
//!
//! Write statements end in `RETURNING` with every schema column, so
//! executors get the affected rows back from the statement itself.

use quickcrud_core::{CrudError, CrudResult};

use super::filters::{FilterClause, FilterSet, Predicate};
use super::operators::ListOp;
use super::pagination::PaginationSpec;
use crate::fields::SemanticType;
use crate::registry::EntitySchema;
use crate::row::Row;
use crate::value::Value;

/// The SQL dialect to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite (uses `?` placeholders).
    Sqlite,
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    Postgres,
}

/// Renders filter sets and row payloads into parameterized SQL.
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::{ColumnSpec, SemanticType};
/// use quickcrud_db::query::{Dialect, FilterClause, FilterSet, PaginationSpec, SqlCompiler};
/// use quickcrud_db::registry::EntitySchema;
/// use quickcrud_db::value::Value;
///
/// let schema = EntitySchema::new(
///     "t",
///     vec![ColumnSpec::new("id", SemanticType::Int64).primary_key()],
///     vec![],
/// )
/// .unwrap();
/// let mut filters = FilterSet::new();
/// filters.insert(FilterClause::equals("id", SemanticType::Int64, Value::Int(7)));
///
/// let (sql, params) = SqlCompiler::new(Dialect::Postgres)
///     .compile_select(&schema, &filters, &PaginationSpec::default().with_limit(1));
/// assert_eq!(sql, "SELECT \"id\" FROM \"t\" WHERE (\"id\" = $1) ORDER BY \"id\" ASC NULLS FIRST LIMIT 1");
/// assert_eq!(params, vec![Value::Int(7)]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SqlCompiler {
    dialect: Dialect,
}

impl SqlCompiler {
    /// Creates a new compiler for the given dialect.
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the dialect.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns a parameter placeholder for the given 1-based index.
    fn placeholder(&self, index: usize) -> String {
        match self.dialect {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Pushes a parameter and returns its placeholder.
    fn bind(&self, value: Value, params: &mut Vec<Value>) -> String {
        params.push(value);
        self.placeholder(params.len())
    }

    /// Compiles a paginated SELECT of every schema column.
    pub fn compile_select(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        pagination: &PaginationSpec,
    ) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}",
            column_list(schema),
            quote(schema.name())
        );
        self.push_where(filters, &mut sql, &mut params);

        let orders: Vec<String> = pagination
            .effective_order(schema)
            .iter()
            .map(|o| {
                let dir = match (o.descending, self.dialect) {
                    (false, Dialect::Sqlite) => "ASC",
                    (true, Dialect::Sqlite) => "DESC",
                    (false, Dialect::Postgres) => "ASC NULLS FIRST",
                    (true, Dialect::Postgres) => "DESC NULLS LAST",
                };
                format!("{} {dir}", quote(&o.column))
            })
            .collect();
        sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));

        let limit = pagination.limit.map(clamp_count);
        match (limit, clamp_count(pagination.offset), self.dialect) {
            (Some(limit), 0, _) => sql.push_str(&format!(" LIMIT {limit}")),
            (Some(limit), offset, _) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (None, 0, _) => {}
            (None, offset, Dialect::Sqlite) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, offset, Dialect::Postgres) => sql.push_str(&format!(" OFFSET {offset}")),
        }

        (sql, params)
    }

    /// Compiles a `COUNT(*)` over the filtered rows, ignoring pagination.
    pub fn compile_count(&self, schema: &EntitySchema, filters: &FilterSet) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote(schema.name()));
        self.push_where(filters, &mut sql, &mut params);
        (sql, params)
    }

    /// Compiles a single-row INSERT returning the stored row.
    ///
    /// Columns absent from `row` are left to the database (autoincrement).
    pub fn compile_insert(&self, schema: &EntitySchema, row: &Row) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let table = quote(schema.name());
        let sql = if row.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let columns: Vec<String> = row.columns().iter().map(|c| quote(c)).collect();
            let placeholders: Vec<String> = row
                .values()
                .iter()
                .map(|v| self.bind(v.clone(), &mut params))
                .collect();
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        (format!("{sql} RETURNING {}", column_list(schema)), params)
    }

    /// Compiles an UPDATE of the matching rows returning the new rows.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::DatabaseError`] if `values` is empty.
    pub fn compile_update(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        values: &Row,
    ) -> CrudResult<(String, Vec<Value>)> {
        if values.is_empty() {
            return Err(CrudError::DatabaseError(
                "UPDATE needs at least one column to set".to_string(),
            ));
        }
        let mut params = Vec::new();
        let set_parts: Vec<String> = values
            .iter()
            .map(|(column, value)| {
                let ph = self.bind(value.clone(), &mut params);
                format!("{} = {ph}", quote(column))
            })
            .collect();
        let mut sql = format!("UPDATE {} SET {}", quote(schema.name()), set_parts.join(", "));
        self.push_where(filters, &mut sql, &mut params);
        sql.push_str(&format!(" RETURNING {}", column_list(schema)));
        Ok((sql, params))
    }

    /// Compiles a DELETE of the matching rows returning the removed rows.
    pub fn compile_delete(&self, schema: &EntitySchema, filters: &FilterSet) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", quote(schema.name()));
        self.push_where(filters, &mut sql, &mut params);
        sql.push_str(&format!(" RETURNING {}", column_list(schema)));
        (sql, params)
    }

    /// Compiles `CREATE TABLE IF NOT EXISTS` for the schema.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SchemaError`] if an autoincrement column cannot be
    /// expressed in SQLite (it must be the sole primary key column).
    pub fn compile_create_table(&self, schema: &EntitySchema) -> CrudResult<String> {
        let pk_count = schema.primary_key_columns().count();
        let mut parts: Vec<String> = Vec::new();

        for column in schema.columns() {
            let mut def = format!("{} {}", quote(&column.name), self.column_type(column.semantic_type));
            let inline_pk = column.primary_key && pk_count == 1;
            if column.autoincrement {
                match self.dialect {
                    Dialect::Sqlite if inline_pk => {
                        def = format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(&column.name));
                        parts.push(def);
                        continue;
                    }
                    Dialect::Sqlite => {
                        return Err(CrudError::SchemaError(format!(
                            "SQLite autoincrement column '{}' must be the only primary key column",
                            column.name
                        )));
                    }
                    Dialect::Postgres => def.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
                }
            }
            if !column.nullable {
                def.push_str(" NOT NULL");
            }
            if inline_pk {
                def.push_str(" PRIMARY KEY");
            } else if column.unique {
                def.push_str(" UNIQUE");
            }
            parts.push(def);
        }

        if pk_count > 1 {
            let cols: Vec<String> = schema.primary_key_columns().map(|c| quote(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }
        parts.extend(schema.unique_constraints().iter().map(|c| c.to_sql()));

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(schema.name()),
            parts.join(", ")
        ))
    }

    /// The column type used in DDL.
    pub const fn column_type(&self, ty: SemanticType) -> &'static str {
        match self.dialect {
            Dialect::Sqlite => match ty {
                SemanticType::Boolean
                | SemanticType::Int8
                | SemanticType::Int16
                | SemanticType::Int32
                | SemanticType::Int64 => "INTEGER",
                SemanticType::Float32 | SemanticType::Float64 => "REAL",
                SemanticType::Binary => "BLOB",
                SemanticType::String
                | SemanticType::FixedChar
                | SemanticType::Date
                | SemanticType::Time
                | SemanticType::Timestamp
                | SemanticType::TimestampTz
                | SemanticType::TimeTz => "TEXT",
            },
            Dialect::Postgres => match ty {
                SemanticType::Boolean => "BOOLEAN",
                SemanticType::Int8 | SemanticType::Int16 => "SMALLINT",
                SemanticType::Int32 => "INTEGER",
                SemanticType::Int64 => "BIGINT",
                SemanticType::Float32 => "REAL",
                SemanticType::Float64 => "DOUBLE PRECISION",
                SemanticType::String => "TEXT",
                SemanticType::FixedChar => "BPCHAR",
                SemanticType::Binary => "BYTEA",
                SemanticType::Date => "DATE",
                SemanticType::Time => "TIME",
                SemanticType::Timestamp => "TIMESTAMP",
                SemanticType::TimestampTz => "TIMESTAMPTZ",
                SemanticType::TimeTz => "TIMETZ",
            },
        }
    }

    /// Appends ` WHERE ...` for the active clauses, if any.
    fn push_where(&self, filters: &FilterSet, sql: &mut String, params: &mut Vec<Value>) {
        let conditions: Vec<String> = filters
            .active_clauses()
            .map(|clause| self.compile_clause(clause, params))
            .collect();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
    }

    /// Compiles a single clause into a parenthesized condition.
    fn compile_clause(&self, clause: &FilterClause, params: &mut Vec<Value>) -> String {
        let column = quote(&clause.column);
        match &clause.predicate {
            Predicate::Range { from_op, from, to_op, to } => {
                let mut parts = Vec::new();
                if let Some(bound) = from {
                    let ph = self.bind(bound.clone(), params);
                    parts.push(format!("{column} {} {ph}", from_op.sql()));
                }
                if let Some(bound) = to {
                    let ph = self.bind(bound.clone(), params);
                    parts.push(format!("{column} {} {ph}", to_op.sql()));
                }
                format!("({})", parts.join(" AND "))
            }
            Predicate::List { op, values } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| self.bind(v.clone(), params))
                    .collect();
                match op {
                    ListOp::In => format!("({column} IN ({}))", placeholders.join(", ")),
                    ListOp::NotIn => format!("({column} NOT IN ({}))", placeholders.join(", ")),
                    ListOp::Equal => {
                        let parts: Vec<String> =
                            placeholders.iter().map(|ph| format!("{column} = {ph}")).collect();
                        format!("({})", parts.join(" OR "))
                    }
                    ListOp::NotEqual => {
                        let parts: Vec<String> =
                            placeholders.iter().map(|ph| format!("{column} <> {ph}")).collect();
                        format!("({})", parts.join(" AND "))
                    }
                }
            }
            Predicate::Match { mode, patterns } => {
                let parts: Vec<String> = patterns
                    .iter()
                    .map(|pattern| match (self.dialect, mode.is_case_insensitive()) {
                        (Dialect::Sqlite, false) => {
                            let ph = self.bind(Value::String(like_to_glob(pattern)), params);
                            format!("{column} GLOB {ph}")
                        }
                        (Dialect::Sqlite, true) => {
                            let ph = self.bind(Value::String(pattern.clone()), params);
                            format!("LOWER({column}) LIKE LOWER({ph})")
                        }
                        (Dialect::Postgres, false) => {
                            let ph = self.bind(Value::String(pattern.clone()), params);
                            format!("{column} LIKE {ph}")
                        }
                        (Dialect::Postgres, true) => {
                            let ph = self.bind(Value::String(pattern.clone()), params);
                            format!("{column} ILIKE {ph}")
                        }
                    })
                    .collect();
                let joined = format!("({})", parts.join(" OR "));
                if mode.is_negated() {
                    format!("(NOT {joined})")
                } else {
                    joined
                }
            }
        }
    }
}

/// Quotes an identifier, doubling embedded quotes.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list(schema: &EntitySchema) -> String {
    schema
        .columns()
        .iter()
        .map(|c| quote(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Caps a page bound at the largest SQL integer. A larger limit or offset
/// selects the same rows.
fn clamp_count(count: u64) -> u64 {
    count.min(i64::MAX.unsigned_abs())
}

/// Translates a LIKE pattern into a case-sensitive SQLite GLOB pattern.
fn like_to_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '%' => glob.push('*'),
            '_' => glob.push('?'),
            '*' => glob.push_str("[*]"),
            '?' => glob.push_str("[?]"),
            '[' => glob.push_str("[[]"),
            other => glob.push(other),
        }
    }
    glob
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::UniqueConstraint;
    use crate::fields::ColumnSpec;
    use crate::query::operators::{MatchMode, RangeFromOp, RangeToOp};
    use crate::query::pagination::OrderBy;

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("id", SemanticType::Int64).primary_key().autoincrement(),
                ColumnSpec::new("n", SemanticType::Int32),
                ColumnSpec::new("s", SemanticType::String).nullable().unique(),
            ],
            vec![],
        )
        .unwrap()
    }

    fn pg() -> SqlCompiler {
        SqlCompiler::new(Dialect::Postgres)
    }

    fn sqlite() -> SqlCompiler {
        SqlCompiler::new(Dialect::Sqlite)
    }

    fn range(from: i64, to: i64) -> FilterClause {
        FilterClause::new(
            "n",
            SemanticType::Int32,
            Predicate::Range {
                from_op: RangeFromOp::GreaterThan,
                from: Some(Value::Int(from)),
                to_op: RangeToOp::LessThanOrEqualTo,
                to: Some(Value::Int(to)),
            },
        )
    }

    fn list(op: ListOp, values: &[i64]) -> FilterClause {
        FilterClause::new(
            "n",
            SemanticType::Int32,
            Predicate::List {
                op,
                values: values.iter().copied().map(Value::Int).collect(),
            },
        )
    }

    fn pattern(mode: MatchMode, patterns: &[&str]) -> FilterClause {
        FilterClause::new(
            "s",
            SemanticType::String,
            Predicate::Match {
                mode,
                patterns: patterns.iter().map(ToString::to_string).collect(),
            },
        )
    }

    fn where_sql(compiler: SqlCompiler, clauses: Vec<FilterClause>) -> (String, Vec<Value>) {
        let mut filters = FilterSet::new();
        for clause in clauses {
            filters.insert(clause);
        }
        compiler.compile_count(&schema(), &filters)
    }

    #[test]
    fn test_select_without_filters() {
        let (sql, params) = sqlite().compile_select(&schema(), &FilterSet::new(), &PaginationSpec::default());
        assert_eq!(sql, "SELECT \"id\", \"n\", \"s\" FROM \"t\" ORDER BY \"id\" ASC");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_order_and_pagination() {
        let page = PaginationSpec::default()
            .order(OrderBy::desc("n"))
            .with_limit(2)
            .with_offset(4);
        let (sql, _) = sqlite().compile_select(&schema(), &FilterSet::new(), &page);
        assert!(sql.ends_with("ORDER BY \"n\" DESC, \"id\" ASC LIMIT 2 OFFSET 4"), "{sql}");

        let (sql, _) = pg().compile_select(&schema(), &FilterSet::new(), &page);
        assert!(
            sql.ends_with("ORDER BY \"n\" DESC NULLS LAST, \"id\" ASC NULLS FIRST LIMIT 2 OFFSET 4"),
            "{sql}"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let page = PaginationSpec::default().with_offset(3);
        let (sql, _) = sqlite().compile_select(&schema(), &FilterSet::new(), &page);
        assert!(sql.ends_with("LIMIT -1 OFFSET 3"), "{sql}");
        let (sql, _) = pg().compile_select(&schema(), &FilterSet::new(), &page);
        assert!(sql.ends_with("ASC NULLS FIRST OFFSET 3"), "{sql}");
    }

    #[test]
    fn test_oversized_page_bounds_are_clamped() {
        let page = PaginationSpec::default().with_limit(u64::MAX).with_offset(u64::MAX);
        let (sql, _) = sqlite().compile_select(&schema(), &FilterSet::new(), &page);
        assert!(
            sql.ends_with("LIMIT 9223372036854775807 OFFSET 9223372036854775807"),
            "{sql}"
        );

        let page = PaginationSpec::default().with_offset(1 << 63);
        let (sql, _) = pg().compile_select(&schema(), &FilterSet::new(), &page);
        assert!(sql.ends_with("OFFSET 9223372036854775807"), "{sql}");
    }

    #[test]
    fn test_range_clause() {
        let (sql, params) = where_sql(pg(), vec![range(1, 5)]);
        assert_eq!(sql, "SELECT COUNT(*) FROM \"t\" WHERE (\"n\" > $1 AND \"n\" <= $2)");
        assert_eq!(params, vec![Value::Int(1), Value::Int(5)]);
    }

    #[test]
    fn test_list_clauses() {
        let (sql, _) = where_sql(sqlite(), vec![list(ListOp::In, &[1, 2])]);
        assert!(sql.ends_with("WHERE (\"n\" IN (?, ?))"), "{sql}");
        let (sql, _) = where_sql(sqlite(), vec![list(ListOp::NotIn, &[1])]);
        assert!(sql.ends_with("WHERE (\"n\" NOT IN (?))"), "{sql}");
        let (sql, _) = where_sql(pg(), vec![list(ListOp::Equal, &[1, 2])]);
        assert!(sql.ends_with("WHERE (\"n\" = $1 OR \"n\" = $2)"), "{sql}");
        let (sql, _) = where_sql(pg(), vec![list(ListOp::NotEqual, &[1, 2])]);
        assert!(sql.ends_with("WHERE (\"n\" <> $1 AND \"n\" <> $2)"), "{sql}");
    }

    #[test]
    fn test_range_and_list_are_anded() {
        let (sql, params) = where_sql(pg(), vec![range(0, 9), list(ListOp::NotEqual, &[4])]);
        assert!(
            sql.ends_with("WHERE (\"n\" > $1 AND \"n\" <= $2) AND (\"n\" <> $3)"),
            "{sql}"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_noop_clause_renders_nothing() {
        let (sql, params) = where_sql(sqlite(), vec![list(ListOp::NotIn, &[])]);
        assert_eq!(sql, "SELECT COUNT(*) FROM \"t\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_match_clauses_sqlite() {
        let (sql, params) = where_sql(sqlite(), vec![pattern(MatchMode::CaseSensitive, &["a%", "b_*"])]);
        assert!(sql.ends_with("WHERE (\"s\" GLOB ? OR \"s\" GLOB ?)"), "{sql}");
        assert_eq!(params, vec![Value::from("a*"), Value::from("b?[*]")]);

        let (sql, _) = where_sql(sqlite(), vec![pattern(MatchMode::NotCaseInsensitive, &["a%"])]);
        assert!(sql.ends_with("WHERE (NOT (LOWER(\"s\") LIKE LOWER(?)))"), "{sql}");
    }

    #[test]
    fn test_match_clauses_pg() {
        let (sql, params) = where_sql(pg(), vec![pattern(MatchMode::CaseInsensitive, &["a%"])]);
        assert!(sql.ends_with("WHERE (\"s\" ILIKE $1)"), "{sql}");
        assert_eq!(params, vec![Value::from("a%")]);
        let (sql, _) = where_sql(pg(), vec![pattern(MatchMode::NotCaseSensitive, &["a%"])]);
        assert!(sql.ends_with("WHERE (NOT (\"s\" LIKE $1))"), "{sql}");
    }

    #[test]
    fn test_insert() {
        let row = Row::from_pairs([("n", Value::Int(1)), ("s", Value::from("x"))]);
        let (sql, params) = pg().compile_insert(&schema(), &row);
        assert_eq!(
            sql,
            "INSERT INTO \"t\" (\"n\", \"s\") VALUES ($1, $2) RETURNING \"id\", \"n\", \"s\""
        );
        assert_eq!(params.len(), 2);

        let (sql, _) = sqlite().compile_insert(&schema(), &Row::new());
        assert_eq!(sql, "INSERT INTO \"t\" DEFAULT VALUES RETURNING \"id\", \"n\", \"s\"");
    }

    #[test]
    fn test_update_numbers_placeholders_across_set_and_where() {
        let mut filters = FilterSet::new();
        filters.insert(list(ListOp::In, &[3]));
        let values = Row::from_pairs([("s", Value::from("y"))]);
        let (sql, params) = pg().compile_update(&schema(), &filters, &values).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"t\" SET \"s\" = $1 WHERE (\"n\" IN ($2)) RETURNING \"id\", \"n\", \"s\""
        );
        assert_eq!(params, vec![Value::from("y"), Value::Int(3)]);
        assert!(pg().compile_update(&schema(), &filters, &Row::new()).is_err());
    }

    #[test]
    fn test_delete() {
        let (sql, _) = sqlite().compile_delete(&schema(), &FilterSet::new());
        assert_eq!(sql, "DELETE FROM \"t\" RETURNING \"id\", \"n\", \"s\"");
    }

    #[test]
    fn test_create_table_sqlite() {
        let sql = sqlite().compile_create_table(&schema()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"n\" INTEGER NOT NULL, \"s\" TEXT UNIQUE)"
        );
    }

    #[test]
    fn test_create_table_composite_keys() {
        let schema = EntitySchema::new(
            "c",
            vec![
                ColumnSpec::new("a", SemanticType::Int32).primary_key(),
                ColumnSpec::new("b", SemanticType::Date).primary_key(),
                ColumnSpec::new("x", SemanticType::String),
                ColumnSpec::new("y", SemanticType::String),
            ],
            vec![UniqueConstraint::new("uq_xy", vec!["x".into(), "y".into()])],
        )
        .unwrap();
        let sql = pg().compile_create_table(&schema).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"c\" (\"a\" INTEGER NOT NULL, \"b\" DATE NOT NULL, \
             \"x\" TEXT NOT NULL, \"y\" TEXT NOT NULL, PRIMARY KEY (\"a\", \"b\"), \
             CONSTRAINT \"uq_xy\" UNIQUE (\"x\", \"y\"))"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }
}
