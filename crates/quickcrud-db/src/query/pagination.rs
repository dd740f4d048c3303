//! Pagination and ordering.
//!
//! Three parameter names are reserved for pagination and can never be column
//! names: `limit`, `offset`, and `order_by_columns`. Each `order_by_columns`
//! value is one `"<column>: <ASC|DESC>"` term; repeat the parameter to sort
//! by several columns.

use std::fmt;

use quickcrud_core::{ParamMap, ValidationError};

use crate::registry::EntitySchema;

/// The `limit` parameter.
pub const LIMIT_PARAM: &str = "limit";
/// The `offset` parameter.
pub const OFFSET_PARAM: &str = "offset";
/// The `order_by_columns` parameter.
pub const ORDER_BY_PARAM: &str = "order_by_columns";

/// Parameter names that are not filters.
pub const RESERVED_PARAMS: [&str; 3] = [LIMIT_PARAM, OFFSET_PARAM, ORDER_BY_PARAM];

/// A column ordering direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The column to order by.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Creates a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.descending { "DESC" } else { "ASC" };
        write!(f, "{}: {dir}", self.column)
    }
}

/// Limit, offset, and ordering of one read.
///
/// The default is "no limit, offset 0, primary-key order". Executors always
/// append the primary key ascending after the requested terms, so every
/// ordering is total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationSpec {
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Number of matching rows to skip.
    pub offset: u64,
    /// Requested sort terms, most significant first.
    pub order_by: Vec<OrderBy>,
}

impl PaginationSpec {
    /// Returns `true` if nothing beyond the default was requested.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Sets the limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Appends a sort term.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// The requested terms followed by the primary-key tiebreak, skipping
    /// key columns the request already sorts by.
    pub fn effective_order(&self, schema: &EntitySchema) -> Vec<OrderBy> {
        let mut order = self.order_by.clone();
        for pk in schema.primary_key_columns() {
            if !order.iter().any(|o| o.column == pk.name) {
                order.push(OrderBy::asc(&pk.name));
            }
        }
        order
    }

    /// Extracts pagination from the reserved parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `limit` or `offset` is not a
    /// non-negative integer, or if an `order_by_columns` term is malformed,
    /// names an unknown column, or repeats a column.
    pub fn from_params(params: &ParamMap, schema: &EntitySchema) -> Result<Self, ValidationError> {
        let limit = params
            .get(LIMIT_PARAM)
            .map(|raw| parse_count(LIMIT_PARAM, raw))
            .transpose()?;
        let offset = params
            .get(OFFSET_PARAM)
            .map(|raw| parse_count(OFFSET_PARAM, raw))
            .transpose()?
            .unwrap_or(0);

        let mut order_by: Vec<OrderBy> = Vec::new();
        for term in params.get_list(ORDER_BY_PARAM) {
            let order = parse_order_term(term, schema)?;
            if order_by.iter().any(|o| o.column == order.column) {
                return Err(ValidationError::new(
                    format!("Column '{}' appears more than once in {ORDER_BY_PARAM}", order.column),
                    "duplicate_order_column",
                )
                .with_param("column", order.column));
            }
            order_by.push(order);
        }

        Ok(Self {
            limit,
            offset,
            order_by,
        })
    }
}

fn parse_count(name: &str, raw: &str) -> Result<u64, ValidationError> {
    raw.trim().parse::<u64>().map_err(|_| {
        ValidationError::new(
            format!("'{name}' must be a non-negative integer, got '{raw}'"),
            format!("invalid_{name}"),
        )
        .with_param("literal", raw)
        .with_param("expected", "non-negative integer")
    })
}

fn parse_order_term(term: &str, schema: &EntitySchema) -> Result<OrderBy, ValidationError> {
    let invalid = |reason: &str| {
        ValidationError::new(
            format!("Invalid {ORDER_BY_PARAM} term '{term}': {reason}"),
            "invalid_order_by",
        )
        .with_param("literal", term)
    };

    if term.contains(',') {
        return Err(invalid("give one term per parameter instead of a comma-separated list"));
    }

    let (column, direction) = match term.split_once(':') {
        Some((column, direction)) => (column.trim(), Some(direction.trim())),
        None => (term.trim(), None),
    };
    if column.is_empty() {
        return Err(invalid("missing column"));
    }
    if schema.column(column).is_none() {
        return Err(invalid("unknown column").with_param("column", column));
    }

    let descending = match direction.map(str::to_ascii_uppercase).as_deref() {
        None | Some("ASC") => false,
        Some("DESC") => true,
        Some(_) => return Err(invalid("direction must be ASC or DESC").with_param("column", column)),
    };
    Ok(OrderBy {
        column: column.to_string(),
        descending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{ColumnSpec, SemanticType};

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("primary_key", SemanticType::Int64).primary_key(),
                ColumnSpec::new("float4_value", SemanticType::Float32),
                ColumnSpec::new("text_value", SemanticType::String),
            ],
            vec![],
        )
        .unwrap()
    }

    fn parse(query: &str) -> Result<PaginationSpec, ValidationError> {
        PaginationSpec::from_params(&ParamMap::parse(query), &schema())
    }

    #[test]
    fn test_absent_means_default() {
        let spec = parse("").unwrap();
        assert!(spec.is_default());
        assert_eq!(spec.limit, None);
        assert_eq!(spec.offset, 0);
    }

    #[test]
    fn test_limit_and_offset() {
        let spec = parse("limit=10&offset=5").unwrap();
        assert_eq!(spec.limit, Some(10));
        assert_eq!(spec.offset, 5);
        assert_eq!(parse("limit=0").unwrap().limit, Some(0));
    }

    #[test]
    fn test_invalid_counts() {
        for query in ["limit=-1", "limit=abc", "offset=1.5", "offset="] {
            let err = parse(query).unwrap_err();
            assert!(err.code.starts_with("invalid_"), "{query}: {}", err.code);
        }
    }

    #[test]
    fn test_order_terms() {
        let spec = parse("order_by_columns=float4_value%3A+DESC&order_by_columns=text_value%3Aasc").unwrap();
        assert_eq!(
            spec.order_by,
            vec![OrderBy::desc("float4_value"), OrderBy::asc("text_value")]
        );
    }

    #[test]
    fn test_bare_column_is_ascending() {
        let spec = parse("order_by_columns=text_value").unwrap();
        assert_eq!(spec.order_by, vec![OrderBy::asc("text_value")]);
    }

    #[test]
    fn test_order_rejections() {
        for (query, needle) in [
            ("order_by_columns=ghost%3A+ASC", "unknown column"),
            ("order_by_columns=text_value%3A+UP", "direction"),
            ("order_by_columns=text_value%3A+ASC%2Cfloat4_value%3A+DESC", "comma"),
            ("order_by_columns=%3A+ASC", "missing column"),
            ("order_by_columns=text_value&order_by_columns=text_value%3A+DESC", "more than once"),
        ] {
            let err = parse(query).unwrap_err();
            assert!(err.message.contains(needle), "{query}: {}", err.message);
        }
    }

    #[test]
    fn test_effective_order_appends_primary_key() {
        let schema = schema();
        let spec = PaginationSpec::default().order(OrderBy::desc("float4_value"));
        assert_eq!(
            spec.effective_order(&schema),
            vec![OrderBy::desc("float4_value"), OrderBy::asc("primary_key")]
        );

        let spec = PaginationSpec::default().order(OrderBy::desc("primary_key"));
        assert_eq!(spec.effective_order(&schema), vec![OrderBy::desc("primary_key")]);
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderBy::desc("a").to_string(), "a: DESC");
    }
}
