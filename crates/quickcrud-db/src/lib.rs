//! # quickcrud-db
//!
//! The request-to-predicate layer of quickcrud. Provides typed column
//! metadata, the operator catalog, the filter compiler that turns flat query
//! parameters into a [`FilterSet`](query::FilterSet), the
//! [`QueryExecutor`](executor::QueryExecutor) contract storage backends
//! implement, and the [`MutationCoordinator`](mutation::MutationCoordinator)
//! that applies insert, replace, patch, and delete semantics on top of it.
//!
//! ## Architecture
//!
//! Schemas are registered once into a [`SchemaRegistry`](registry::SchemaRegistry)
//! and shared read-only behind an `Arc`. Each request compiles its parameters
//! into a `FilterSet` and a [`PaginationSpec`](query::PaginationSpec), both
//! plain values that are discarded after the request. No storage call happens
//! until compilation has fully succeeded.
//!
//! ## Module Overview
//!
//! - [`fields`] - [`SemanticType`](fields::SemanticType) and [`ColumnSpec`](fields::ColumnSpec)
//! - [`value`] - The [`Value`](value::Value) scalar and its literal/JSON codecs
//! - [`constraints`] - Composite uniqueness groups
//! - [`registry`] - Entity schemas and the process-wide registry
//! - [`row`] - The ordered [`Row`](row::Row) payload
//! - [`query`] - Operator catalog, key grammar, filter compiler, pagination, SQL rendering
//! - [`executor`] - The storage contract
//! - [`mutation`] - The mutation coordinator

// These clippy lints are intentionally allowed for the db crate:
// - struct_excessive_bools: ColumnSpec carries one flag per column property
// - cast_precision_loss: int-to-float casts are needed for mixed numeric comparison
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - missing_errors_doc: every fallible function returns CrudError
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]

pub mod constraints;
pub mod executor;
pub mod fields;
pub mod mutation;
pub mod query;
pub mod registry;
pub mod row;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use constraints::UniqueConstraint;
pub use executor::{FindResult, QueryExecutor, UpdateMode};
pub use fields::{ColumnSpec, SemanticType};
pub use mutation::MutationCoordinator;
pub use query::{
    allowed_operators, CompileOptions, CompiledQuery, Dialect, FilterClause, FilterCompiler,
    FilterSet, OperatorClass, OrderBy, PaginationSpec, SqlCompiler,
};
pub use registry::{EntitySchema, SchemaRegistry};
pub use row::Row;
pub use value::Value;
