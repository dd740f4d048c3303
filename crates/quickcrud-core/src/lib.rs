//! # quickcrud-core
//!
//! Core types shared by every quickcrud crate. This crate has no storage or
//! HTTP dependencies and provides the foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - The [`CrudError`] taxonomy and result alias
//! - [`utils`] - Utility types ([`ParamMap`](utils::ParamMap))
//! - [`settings`] - Runtime configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{CrudError, CrudResult, ValidationError};
pub use settings::Settings;
pub use utils::ParamMap;
