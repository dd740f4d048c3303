//! The neutral row payload.
//!
//! A [`Row`] is an ordered list of `(column, value)` pairs. Executors produce
//! rows in schema column order; request bodies produce rows holding only the
//! columns the client supplied. Rows serialize to a JSON object whose keys
//! follow that order.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

/// A mapping from column name to typed value that preserves column order.
///
/// # Examples
///
/// ```
/// use quickcrud_db::row::Row;
/// use quickcrud_db::value::Value;
///
/// let mut row = Row::from_pairs([("primary_key", Value::Int(0)), ("text_value", Value::from("a"))]);
/// row.set("text_value", "b");
/// assert_eq!(row.get("text_value"), Some(&Value::from("b")));
/// assert_eq!(row.columns(), &["primary_key".to_string(), "text_value".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates an empty row.
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds a row from `(column, value)` pairs. Later pairs overwrite
    /// earlier ones with the same column.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.set(k, v);
        }
        row
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the value stored for a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.values[idx])
    }

    /// Returns `true` if the row holds the column.
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Sets a column's value, appending the column if it is new.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Iterates over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Copies every column of `other` into this row.
    pub fn merge(&mut self, other: &Self) {
        for (column, value) in other.iter() {
            self.set(column, value.clone());
        }
    }

    /// Renders the row as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(column, value)| (column.to_string(), value.to_json()))
                .collect(),
        )
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &value.to_json())?;
        }
        map.end()
    }
}
