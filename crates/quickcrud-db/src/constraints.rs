//! Uniqueness constraints.
//!
//! A [`UniqueConstraint`] names a group of columns whose combined values must
//! be unique across an entity. Single-column `unique` flags and the primary
//! key are normalized into the same representation by
//! [`EntitySchema`](crate::registry::EntitySchema), so executors check one list.
//!
//! NULL components never collide: two rows that share every non-null value
//! of a group but hold NULL in any member are distinct, as in SQL.

use crate::row::Row;

/// A UNIQUE constraint over one or more columns.
///
/// # Examples
///
/// ```
/// use quickcrud_db::constraints::UniqueConstraint;
///
/// let c = UniqueConstraint::new("uq_name_dob", vec!["name".into(), "dob".into()]);
/// assert_eq!(c.columns(), &["name".to_string(), "dob".to_string()]);
/// assert_eq!(c.to_sql(), "CONSTRAINT \"uq_name_dob\" UNIQUE (\"name\", \"dob\")");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// The constraint name.
    name: String,
    /// The columns that must be unique together.
    columns: Vec<String>,
}

impl UniqueConstraint {
    /// Creates a new unique constraint on the given columns.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in this constraint.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns `true` if both rows hold equal, non-null values in every
    /// column of the group.
    pub fn collides(&self, a: &Row, b: &Row) -> bool {
        self.columns.iter().all(|column| match (a.get(column), b.get(column)) {
            (Some(x), Some(y)) => x.sql_eq(y),
            _ => false,
        })
    }

    /// Renders the table-level constraint clause for DDL.
    pub fn to_sql(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(|c| format!("\"{c}\"")).collect();
        format!("CONSTRAINT \"{}\" UNIQUE ({})", self.name, cols.join(", "))
    }
}
