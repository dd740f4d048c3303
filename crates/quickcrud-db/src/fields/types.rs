//! Column type definitions.
//!
//! Each [`SemanticType`] variant names the logical kind of a column. The set
//! is closed: everything downstream (the operator catalog, literal parsing,
//! storage mapping) matches on it exhaustively. [`ColumnSpec`] captures all
//! metadata about a single column and is immutable once its entity is
//! registered.

use crate::value::Value;

/// The logical data kind of a column, independent of storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// true/false.
    Boolean,
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating-point number.
    Float32,
    /// 64-bit floating-point number.
    Float64,
    /// Variable-length text.
    String,
    /// Fixed-length character data.
    FixedChar,
    /// Raw binary data.
    Binary,
    /// Calendar date.
    Date,
    /// Time of day without zone.
    Time,
    /// Date and time without zone.
    Timestamp,
    /// An instant, normalized to UTC.
    TimestampTz,
    /// Time of day with a UTC offset.
    TimeTz,
}

impl SemanticType {
    /// Every semantic type, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Boolean,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::String,
        Self::FixedChar,
        Self::Binary,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::TimestampTz,
        Self::TimeTz,
    ];

    /// The type's name as shown in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::FixedChar => "fixed_char",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamp_tz",
            Self::TimeTz => "time_tz",
        }
    }

    /// Integer types of any width.
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Integer and floating-point types.
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Self::Float32 | Self::Float64)
    }

    /// Dates, times, and timestamps (zoned or not).
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::Timestamp | Self::TimestampTz | Self::TimeTz
        )
    }

    /// Character data.
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::FixedChar)
    }

    /// Inclusive bounds for integer widths.
    pub const fn integer_bounds(self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete definition of an entity column.
///
/// Built with the chained setters below and handed to
/// [`EntitySchema::new`](crate::registry::EntitySchema::new).
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::{ColumnSpec, SemanticType};
///
/// let id = ColumnSpec::new("primary_key", SemanticType::Int64).primary_key().autoincrement();
/// assert!(id.primary_key);
/// assert!(!id.is_required_on_insert());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnSpec {
    /// The column name, unique within its entity.
    pub name: String,
    /// The logical type of the column.
    pub semantic_type: SemanticType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether this column is (part of) the primary key.
    pub primary_key: bool,
    /// Whether a single-column UNIQUE constraint applies.
    pub unique: bool,
    /// Whether storage generates the value when it is omitted on insert.
    pub autoincrement: bool,
    /// Value used when the column is omitted on insert or replace.
    #[serde(skip)]
    pub default: Option<Value>,
}

impl ColumnSpec {
    /// Creates a non-null, non-key column with no default.
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            nullable: false,
            primary_key: false,
            unique: false,
            autoincrement: false,
            default: None,
        }
    }

    /// Allows NULL values.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks this column as (part of) the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Applies a single-column UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Lets storage generate the value (integer keys only).
    #[must_use]
    pub const fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// A column that must be supplied on insert: non-null with no default
    /// and no generated value.
    pub const fn is_required_on_insert(&self) -> bool {
        !self.nullable && self.default.is_none() && !self.autoincrement
    }

    /// The value a full replace writes when the column is omitted, or `None`
    /// if the column has to be supplied.
    pub fn replace_fallback(&self) -> Option<Value> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None if self.nullable => Some(Value::Null),
            None => None,
        }
    }
}
