//! # quickcrud
//!
//! Typed-entity CRUD over HTTP. Register entity schemas, pick a storage
//! engine, and every entity gets list/create/replace/patch/delete routes
//! driven by a query-string filter grammar.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on the
//! individual crates for finer-grained control.
//!
//! ```no_run
//! use quickcrud::prelude::*;
//!
//! # async fn serve() -> CrudResult<()> {
//! let settings = Settings::default();
//! setup_logging(&settings);
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     "books",
//!     vec![
//!         ColumnSpec::new("id", SemanticType::Int64).primary_key().autoincrement(),
//!         ColumnSpec::new("title", SemanticType::String),
//!         ColumnSpec::new("published", SemanticType::Date).nullable(),
//!     ],
//! )?;
//!
//! CrudApp::from_settings(settings, registry)?.run("127.0.0.1:8000").await
//! # }
//! ```

/// Settings, logging, error types, and query-parameter parsing.
pub use quickcrud_core as core;

/// Column metadata, filter compiler, executor contract, and coordinator.
pub use quickcrud_db as db;

/// Query executors: in-memory and `SQLite`.
pub use quickcrud_db_backends as db_backends;

/// Axum routes and application assembly.
#[cfg(feature = "http")]
pub use quickcrud_http as http;

/// The types most applications need.
pub mod prelude {
    pub use quickcrud_core::logging::setup_logging;
    pub use quickcrud_core::{CrudError, CrudResult, ParamMap, Settings, ValidationError};
    pub use quickcrud_db::{
        ColumnSpec, FindResult, MutationCoordinator, QueryExecutor, Row, SchemaRegistry,
        SemanticType, UniqueConstraint, Value,
    };
    pub use quickcrud_db_backends::InMemoryExecutor;
    #[cfg(feature = "sqlite")]
    pub use quickcrud_db_backends::SqliteExecutor;
    #[cfg(feature = "http")]
    pub use quickcrud_http::{CrudApp, CrudRouter};
}
