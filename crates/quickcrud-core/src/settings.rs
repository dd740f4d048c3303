//! Runtime configuration for quickcrud.
//!
//! [`Settings`] holds everything needed to assemble a CRUD service: the
//! storage engine, logging, the URL prefix routes are mounted under, and the
//! filter compiler's strictness. Load it with
//! [`settings_loader`](crate::settings_loader) or build it in code.

use serde::{Deserialize, Serialize};

/// Storage engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The storage engine: `"memory"` or `"sqlite"`.
    pub engine: String,
    /// The database name (file path for SQLite, `":memory:"` for a private in-memory database).
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "memory".to_string(),
            name: ":memory:".to_string(),
        }
    }
}

/// Settings for the HTTP surface and the filter compiler it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Prefix prepended to every entity route (e.g. `"/api"`).
    pub url_prefix: String,
    /// Reject modifier keys (e.g. `col____list_____comparison_operator`)
    /// that arrive without any operand values instead of ignoring them.
    pub reject_operandless_modifiers: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url_prefix: String::new(),
            reject_operandless_modifiers: false,
        }
    }
}

/// The complete set of quickcrud settings.
///
/// # Examples
///
/// ```
/// use quickcrud_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.database.engine, "memory");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log filter (e.g. "info", "quickcrud_db=debug,info").
    pub log_level: String,
    /// Storage engine configuration.
    pub database: DatabaseSettings,
    /// HTTP and compiler configuration.
    pub api: ApiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            database: DatabaseSettings::default(),
            api: ApiSettings::default(),
        }
    }
}
