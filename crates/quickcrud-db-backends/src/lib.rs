//! # quickcrud-db-backends
//!
//! Storage backends implementing the
//! [`QueryExecutor`](quickcrud_db::QueryExecutor) contract.
//!
//! Supported backends:
//! - in-memory ([`InMemoryExecutor`]), always available
//! - `SQLite` ([`SqliteExecutor`], feature `sqlite`, on by default)
//!
//! [`executor_for`] builds the backend named by the database settings.

// These clippy lints are intentionally allowed for the backends crate:
// - cast_possible_wrap / cast_sign_loss: SQLite counts are i64, pagination is u64
// - significant_drop_tightening: table guards are held for the whole atomic operation
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::doc_markdown)]

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use quickcrud_core::settings::DatabaseSettings;
use quickcrud_core::{CrudError, CrudResult};
use quickcrud_db::QueryExecutor;

pub use memory::InMemoryExecutor;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

/// Builds the executor named by `settings.engine`.
///
/// Known engines are `memory` and (with the `sqlite` feature) `sqlite`,
/// which opens `settings.name` as a file path or `:memory:`.
///
/// # Errors
///
/// Returns [`CrudError::ConfigurationError`] for an unknown engine and
/// [`CrudError::OperationalError`] if the database cannot be opened.
pub fn executor_for(settings: &DatabaseSettings) -> CrudResult<Arc<dyn QueryExecutor>> {
    match settings.engine.as_str() {
        "memory" => Ok(Arc::new(InMemoryExecutor::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteExecutor::open(&settings.name)?)),
        other => Err(CrudError::ConfigurationError(format!(
            "Unknown database engine '{other}'"
        ))),
    }
}
