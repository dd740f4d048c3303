//! Settings loading from configuration files.
//!
//! This module loads [`Settings`] from TOML or JSON and applies environment
//! variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `QUICKCRUD_DEBUG` | `debug` |
//! | `QUICKCRUD_LOG_LEVEL` | `log_level` |
//! | `QUICKCRUD_DATABASE_ENGINE` | `database.engine` |
//! | `QUICKCRUD_DATABASE_NAME` | `database.name` |
//! | `QUICKCRUD_URL_PREFIX` | `api.url_prefix` |
//! | `QUICKCRUD_REJECT_OPERANDLESS_MODIFIERS` | `api.reject_operandless_modifiers` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use quickcrud_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/quickcrud.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::CrudError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, CrudError> {
    // Merge through serde_json so partial tables keep their defaults.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| CrudError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_into_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, CrudError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, CrudError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, CrudError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CrudError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_into_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, CrudError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `QUICKCRUD_*` environment variable overrides to a settings struct.
///
/// Boolean variables accept "true", "1", or "yes" (case-insensitive) as true;
/// anything else is false.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("QUICKCRUD_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("QUICKCRUD_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("QUICKCRUD_DATABASE_ENGINE") {
        settings.database.engine = val;
    }

    if let Ok(val) = std::env::var("QUICKCRUD_DATABASE_NAME") {
        settings.database.name = val;
    }

    if let Ok(val) = std::env::var("QUICKCRUD_URL_PREFIX") {
        settings.api.url_prefix = val;
    }

    if let Ok(val) = std::env::var("QUICKCRUD_REJECT_OPERANDLESS_MODIFIERS") {
        settings.api.reject_operandless_modifiers = parse_flag(&val);
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path, format: &str) -> Result<String, CrudError> {
    std::fs::read_to_string(path).map_err(|e| {
        CrudError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_into_defaults(overrides: serde_json::Value, format: &str) -> Result<Settings, CrudError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        CrudError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, overrides);
    serde_json::from_value(merged).map_err(|e| {
        CrudError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
debug = false
log_level = "debug"
"#;
        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.database.engine, "memory");
    }

    #[test]
    fn test_from_toml_str_partial_table_keeps_defaults() {
        let toml = r#"
[database]
engine = "sqlite"

[api]
reject_operandless_modifiers = true
"#;
        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.database.engine, "sqlite");
        assert_eq!(settings.database.name, ":memory:");
        assert!(settings.api.reject_operandless_modifiers);
        assert_eq!(settings.api.url_prefix, "");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(matches!(result, Err(CrudError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("debug = \"sometimes\"");
        assert!(matches!(result, Err(CrudError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{"api": {"url_prefix": "/api"}, "database": {"name": "crud.db"}}"#;
        let settings = from_json_str(json).unwrap();
        assert_eq!(settings.api.url_prefix, "/api");
        assert_eq!(settings.database.name, "crud.db");
        assert_eq!(settings.database.engine, "memory");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/quickcrud.toml");
        assert!(matches!(result, Err(CrudError::ConfigurationError(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("YES"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("QUICKCRUD_URL_PREFIX", "/v1");
        std::env::set_var("QUICKCRUD_REJECT_OPERANDLESS_MODIFIERS", "1");
        let settings = from_env();
        std::env::remove_var("QUICKCRUD_URL_PREFIX");
        std::env::remove_var("QUICKCRUD_REJECT_OPERANDLESS_MODIFIERS");
        assert_eq!(settings.api.url_prefix, "/v1");
        assert!(settings.api.reject_operandless_modifiers);
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": 3});
        let over = serde_json::json!({"a": {"y": 20}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 20}, "b": 3}));
    }
}
