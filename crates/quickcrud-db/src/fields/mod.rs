//! Column definitions and semantic types.
//!
//! This module provides the [`ColumnSpec`] struct and [`SemanticType`] enum
//! that describe an entity's columns independently of any storage engine.

pub mod types;

pub use types::{ColumnSpec, SemanticType};
