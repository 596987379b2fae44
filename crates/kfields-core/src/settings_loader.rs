//! Settings loading from configuration files.
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
//! | `KFIELDS_DEBUG` | `debug` |
//! | `KFIELDS_LOG_LEVEL` | `log_level` |
//! | `KFIELDS_TIME_ZONE` | `time_zone` |
//!
//! The prefix map is file-only:
//!
//! ```toml
//! time_zone = "+02:00"
//!
//! [kidx_model_map]
//! shop_order = "ORD"
//! shop_customer = "CUS"
//! ```

use std::path::Path;

use crate::error::{FieldError, FieldResult};
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Keys not present in the TOML keep their default values. The prefix map is
/// validated after loading.
pub fn from_toml_str(toml_str: &str) -> FieldResult<Settings> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FieldError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    from_overrides(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> FieldResult<Settings> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> FieldResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> FieldResult<Settings> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FieldError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    from_overrides(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> FieldResult<Settings> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from a JSON file and then applies environment variable overrides.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> FieldResult<Settings> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `KFIELDS_*` environment variable overrides to a settings struct.
///
/// `KFIELDS_DEBUG` accepts "true", "1" and "yes" (case-insensitive) as true;
/// anything else is false.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("KFIELDS_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("KFIELDS_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("KFIELDS_TIME_ZONE") {
        settings.time_zone = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> FieldResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        FieldError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn from_overrides(overrides: serde_json::Value, format: &str) -> FieldResult<Settings> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FieldError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, overrides);
    let settings: Settings = serde_json::from_value(merged).map_err(|e| {
        FieldError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })?;
    settings.kidx_model_map.validate()?;
    Ok(settings)
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
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Recursively merges `overlay` into `base`. Tables merge key by key; any
/// other overlay value replaces the base value.
fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    match (base, overlay) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}
