//! Typed scalar values.
//!
//! The [`Value`] enum is the neutral representation used for filter operands,
//! row cells, and executor parameters. Values are created from three
//! boundaries, each keyed by the column's [`SemanticType`]:
//!
//! - [`Value::parse_literal`] for query-string operands,
//! - [`Value::from_json`] for request bodies,
//! - storage backends, which decode their own encodings.
//!
//! [`Value::to_json`] renders a value for responses.

use std::cmp::Ordering;
use std::fmt;

use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::fields::SemanticType;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// A typed scalar.
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::SemanticType;
/// use quickcrud_db::value::Value;
///
/// assert_eq!(Value::parse_literal("42", SemanticType::Int16), Some(Value::Int(42)));
/// assert_eq!(Value::parse_literal("70000", SemanticType::Int16), None);
/// assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// A boolean value.
    Bool(bool),
    /// Any integer width, widened to 64 bits.
    Int(i64),
    /// Any float width, widened to 64 bits.
    Float(f64),
    /// Character data.
    String(String),
    /// Raw binary data.
    Bytes(Vec<u8>),
    /// A date without time.
    Date(NaiveDate),
    /// A time without date or zone.
    Time(NaiveTime),
    /// A time of day with its UTC offset.
    TimeTz(NaiveTime, FixedOffset),
    /// A date and time without zone.
    DateTime(NaiveDateTime),
    /// An instant in UTC.
    DateTimeTz(DateTime<Utc>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Date(d) => write!(f, "{d}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::TimeTz(t, off) => write!(f, "{t}{off}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::DateTimeTz(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

// ── From implementations ───────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTimeTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

// ── Parsing ────────────────────────────────────────────────────────────

impl Value {
    /// Parses a query-string literal as the given semantic type.
    ///
    /// Returns `None` when the literal is not a valid value of that type.
    /// Parsing is locale-independent: numbers use `.` as the decimal point
    /// and temporal values use ISO 8601 forms.
    pub fn parse_literal(text: &str, ty: SemanticType) -> Option<Self> {
        match ty {
            SemanticType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Self::Bool(true)),
                "false" | "0" => Some(Self::Bool(false)),
                _ => None,
            },
            SemanticType::Int8 => text.parse::<i8>().ok().map(Self::from),
            SemanticType::Int16 => text.parse::<i16>().ok().map(Self::from),
            SemanticType::Int32 => text.parse::<i32>().ok().map(Self::from),
            SemanticType::Int64 => text.parse::<i64>().ok().map(Self::from),
            SemanticType::Float32 => text
                .parse::<f32>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Self::from),
            SemanticType::Float64 => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Self::from),
            SemanticType::String | SemanticType::FixedChar => Some(Self::String(text.to_string())),
            SemanticType::Binary => base64::engine::general_purpose::STANDARD
                .decode(text)
                .ok()
                .map(Self::Bytes),
            SemanticType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(Self::Date),
            SemanticType::Time => parse_time(text).map(Self::Time),
            SemanticType::TimeTz => parse_time_tz(text).map(|(t, off)| Self::TimeTz(t, off)),
            SemanticType::Timestamp => TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(Self::DateTime),
            SemanticType::TimestampTz => parse_timestamp_tz(text).map(Self::DateTimeTz),
        }
    }

    /// Converts a JSON body value into a typed value for the given semantic type.
    ///
    /// JSON `null` becomes [`Value::Null`]; the caller decides whether the
    /// column accepts it. Numbers must be JSON numbers, booleans JSON
    /// booleans; textual, binary (base64), and temporal types take strings.
    pub fn from_json(json: &serde_json::Value, ty: SemanticType) -> Option<Self> {
        use serde_json::Value as Json;

        match (json, ty) {
            (Json::Null, _) => Some(Self::Null),
            (Json::Bool(b), SemanticType::Boolean) => Some(Self::Bool(*b)),
            (Json::Number(n), ty) if ty.is_integer() => {
                let (min, max) = ty.integer_bounds()?;
                n.as_i64().filter(|i| (min..=max).contains(i)).map(Self::Int)
            }
            (Json::Number(n), SemanticType::Float32) => n
                .as_f64()
                .filter(|f| f.abs() <= f64::from(f32::MAX))
                .map(|f| Self::Float(f64::from(f as f32))),
            (Json::Number(n), SemanticType::Float64) => n.as_f64().map(Self::Float),
            (Json::String(s), ty) if ty.is_textual() || ty.is_temporal() || ty == SemanticType::Binary => {
                Self::parse_literal(s, ty)
            }
            _ => None,
        }
    }

    /// Renders this value as JSON for responses.
    ///
    /// Binary data is base64-encoded; temporal values use ISO 8601 strings;
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
            Self::Date(_)
            | Self::Time(_)
            | Self::TimeTz(..)
            | Self::DateTime(_)
            | Self::DateTimeTz(_) => Json::String(self.to_string()),
        }
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

/// Parses `HH:MM[:SS[.f]]` followed by `Z`, `±HH`, `±HHMM`, or `±HH:MM`.
fn parse_time_tz(text: &str) -> Option<(NaiveTime, FixedOffset)> {
    if let Some(time) = text.strip_suffix('Z') {
        return parse_time(time).zip(FixedOffset::east_opt(0));
    }
    let split = text.rfind(['+', '-'])?;
    let (time, offset) = text.split_at(split);
    parse_time(time).zip(parse_offset(offset))
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let sign = match text.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = text[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_timestamp_tz(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── Accessors and comparison ───────────────────────────────────────────

impl Value {
    /// Returns `true` if this value is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Compares two non-null values of compatible kinds.
    ///
    /// Returns `None` if either side is `Null` or the kinds differ, which is
    /// how NULL behaves in SQL comparisons. Integers and floats compare
    /// numerically; zoned times compare on their UTC time of day.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::TimeTz(a, a_off), Self::TimeTz(b, b_off)) => {
                Some(utc_time_of_day(*a, *a_off).cmp(&utc_time_of_day(*b, *b_off)))
            }
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::DateTimeTz(a), Self::DateTimeTz(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// SQL equality: `false` whenever either side is `Null`.
    pub fn sql_eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// A total order for sorting result rows: `Null` sorts first, and
    /// incomparable kinds are treated as equal.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

/// Shifts a zoned time of day to UTC, wrapping around midnight.
pub fn utc_time_of_day(time: NaiveTime, offset: FixedOffset) -> NaiveTime {
    let shift = chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
    time.overflowing_sub_signed(shift).0
}
