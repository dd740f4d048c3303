//! Core error types for quickcrud.
//!
//! This module provides the [`CrudError`] enum covering every failure the
//! filter compiler, schema registry, mutation coordinator, and storage
//! executors can report. Each variant maps to an HTTP status code via
//! [`CrudError::status_code`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A request-level validation failure with structured context.
///
/// The `params` map carries the pieces a client needs to fix the request,
/// such as the offending `column`, `operator`, `literal`, and `expected` type.
///
/// # Examples
///
/// ```
/// use quickcrud_core::error::ValidationError;
///
/// let err = ValidationError::new("Value is not a valid int32.", "invalid_operand")
///     .with_param("column", "int4_value")
///     .with_param("literal", "abc");
/// assert_eq!(err.param("column"), Some("int4_value"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the type of failure (e.g. "invalid_operand").
    pub code: String,
    /// Additional parameters providing context for the message.
    pub params: BTreeMap<String, String>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a context parameter by name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// An operator that the column's semantic type does not support.
    pub fn operator_not_allowed(column: &str, operator: &str, type_name: &str) -> Self {
        Self::new(
            format!("Operator '{operator}' is not allowed on {type_name} column '{column}'"),
            "operator_not_allowed",
        )
        .with_param("column", column)
        .with_param("operator", operator)
    }

    /// An operand literal that does not parse as the column's semantic type.
    pub fn invalid_operand(column: &str, literal: &str, expected: &str) -> Self {
        Self::new(
            format!("Value '{literal}' for column '{column}' is not a valid {expected}"),
            "invalid_operand",
        )
        .with_param("column", column)
        .with_param("literal", literal)
        .with_param("expected", expected)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for quickcrud.
#[derive(Error, Debug)]
pub enum CrudError {
    // ── Registry ─────────────────────────────────────────────────────

    /// The entity schema is misconfigured. Fatal at startup.
    #[error("Schema error: {0}")]
    SchemaError(String),

    // ── Request errors ───────────────────────────────────────────────

    /// The request referenced a column the entity does not have.
    #[error("Unknown column '{column}' on entity '{entity}'")]
    UnknownColumn {
        /// The entity the request targeted.
        entity: String,
        /// The column name as written in the request.
        column: String,
    },

    /// An operator, operand, body, or pagination parameter is invalid.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    /// A primary-key or unique constraint would be violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A single-resource lookup matched no row.
    #[error("Not found: {0}")]
    NotFound(String),

    // ── Storage ──────────────────────────────────────────────────────

    /// A generic storage error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An operational storage error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CrudError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `UnknownColumn`, `ValidationError` -> 400
    /// - `NotFound` -> 404
    /// - `Conflict` -> 409
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UnknownColumn { .. } | Self::ValidationError(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::SchemaError(_)
            | Self::DatabaseError(_)
            | Self::OperationalError(_)
            | Self::ConfigurationError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Shorthand for an unknown-column error.
    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    /// Returns `true` if this error was caused by the client request.
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status_code(), 400..=499)
    }
}

impl From<ValidationError> for CrudError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, CrudError>`.
pub type CrudResult<T> = Result<T, CrudError>;
