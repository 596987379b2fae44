//! `EnforcedKeyJsonField`: a JSON field with optional structure enforcement.
//!
//! Two enforcement modes are available:
//!
//! - **full**: the payload must satisfy a JSON Schema document.
//! - **partial**: the payload must be an object whose top-level keys are
//!   exactly the configured allowed keys.
//!
//! Without either mode the field behaves like a plain `JsonField`. Checks run
//! on every save and in `full_clean`; with `read_time_validate` they also run
//! when a row is loaded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kfields_core::{FieldError, FieldResult, ValidationError};

use crate::fields::hooks::{FieldDeconstruction, FieldHooks};
use crate::fields::{FieldDef, FieldType};
use crate::model::{ModelMeta, ModelRecord};
use crate::value::Value;

/// Where a full-mode schema document comes from.
///
/// The document is loaded and parsed on every validation call, so edits to a
/// schema file take effect without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// A schema file on disk.
    File(PathBuf),
    /// A schema document held in memory.
    Inline(String),
}

impl SchemaSource {
    /// A schema file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// A schema file at `path`, resolved against `base_dir` when relative.
    ///
    /// ```
    /// use kfields_db::fields::SchemaSource;
    ///
    /// let src = SchemaSource::relative_to(env!("CARGO_MANIFEST_DIR"), "schemas/order.json");
    /// assert!(matches!(src, SchemaSource::File(p) if p.ends_with("schemas/order.json")));
    /// ```
    pub fn relative_to(base_dir: impl AsRef<Path>, path: impl AsRef<Path>) -> Self {
        Self::File(base_dir.as_ref().join(path))
    }

    /// An in-memory schema document.
    pub fn inline(schema: impl Into<String>) -> Self {
        Self::Inline(schema.into())
    }

    /// Reads and parses the schema document.
    ///
    /// Read failures surface as [`FieldError::IoError`] and malformed JSON as
    /// [`FieldError::JsonError`].
    pub fn load(&self) -> FieldResult<serde_json::Value> {
        let text = match self {
            Self::File(path) => std::fs::read_to_string(path)?,
            Self::Inline(text) => text.clone(),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline(_) => "<inline>".to_string(),
        }
    }
}

/// The enforcement mode of a built field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enforcement {
    /// No constraint.
    None,
    /// Conformance to a JSON Schema.
    Full(SchemaSource),
    /// An exact set of top-level keys.
    Partial(BTreeSet<String>),
}

/// Builder for an enforced-key JSON field.
///
/// Mode options are checked in [`build`](Self::build), so a misconfigured
/// field fails when the model is defined, before any record exists.
///
/// # Examples
///
/// ```
/// use kfields_db::fields::{EnforcedKeyJsonField, SchemaSource};
///
/// let partial = EnforcedKeyJsonField::new()
///     .partial(true)
///     .allowed_keys(["street", "city"])
///     .build("address")
///     .unwrap();
/// assert!(partial.hooks.is_some());
///
/// let err = EnforcedKeyJsonField::new().full(true).build("details").unwrap_err();
/// assert!(err.is_configuration());
///
/// let full = EnforcedKeyJsonField::new()
///     .full(true)
///     .schema(SchemaSource::inline(r#"{"type": "object"}"#))
///     .read_time_validate(true)
///     .build("details");
/// assert!(full.is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnforcedKeyJsonField {
    full: bool,
    partial: bool,
    schema: Option<SchemaSource>,
    allowed_keys: BTreeSet<String>,
    read_time_validate: bool,
    null: bool,
}

impl EnforcedKeyJsonField {
    /// Creates a field with no enforcement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests full (schema) enforcement.
    #[must_use]
    pub const fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    /// Requests partial (key-set) enforcement.
    #[must_use]
    pub const fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Sets the schema used by full enforcement.
    #[must_use]
    pub fn schema(mut self, schema: SchemaSource) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the keys required by partial enforcement.
    #[must_use]
    pub fn allowed_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Re-checks stored payloads when rows are loaded.
    #[must_use]
    pub const fn read_time_validate(mut self, enabled: bool) -> Self {
        self.read_time_validate = enabled;
        self
    }

    /// Allows NULL payloads.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Checks the mode options and produces the field definition.
    pub fn build(self, name: &'static str) -> FieldResult<FieldDef> {
        let enforcement = match (self.full, self.partial) {
            (true, true) => {
                return Err(FieldError::ConfigurationError(format!(
                    "EnforcedKeyJsonField '{name}': full and partial enforcement are mutually exclusive"
                )))
            }
            (true, false) => Enforcement::Full(self.schema.ok_or_else(|| {
                FieldError::ConfigurationError(format!(
                    "EnforcedKeyJsonField '{name}': full enforcement requires a schema"
                ))
            })?),
            (false, true) if self.allowed_keys.is_empty() => {
                return Err(FieldError::ConfigurationError(format!(
                    "EnforcedKeyJsonField '{name}': partial enforcement requires allowed_keys"
                )))
            }
            (false, true) => Enforcement::Partial(self.allowed_keys),
            (false, false) => Enforcement::None,
        };

        let hooks = EnforcedKeyJson {
            enforcement,
            read_time_validate: self.read_time_validate,
        };
        let def = FieldDef::new(name, FieldType::JsonField).with_hooks(Arc::new(hooks));
        Ok(if self.null { def.nullable().blank() } else { def })
    }
}

/// The hooks of a built [`EnforcedKeyJsonField`].
#[derive(Debug, Clone)]
pub struct EnforcedKeyJson {
    enforcement: Enforcement,
    read_time_validate: bool,
}

impl EnforcedKeyJson {
    /// Returns the enforcement mode.
    pub const fn enforcement(&self) -> &Enforcement {
        &self.enforcement
    }

    /// Returns `true` if payloads are re-checked when loaded.
    pub const fn validates_on_read(&self) -> bool {
        self.read_time_validate
    }

    /// Checks a non-null payload against the configured mode.
    pub fn enforce(&self, payload: &serde_json::Value, meta: &ModelMeta) -> FieldResult<()> {
        match &self.enforcement {
            Enforcement::None => Ok(()),
            Enforcement::Full(source) => Self::check_schema(source, payload, meta),
            Enforcement::Partial(allowed) => Self::check_keys(allowed, payload),
        }
    }

    fn check_schema(
        source: &SchemaSource,
        payload: &serde_json::Value,
        meta: &ModelMeta,
    ) -> FieldResult<()> {
        if meta.is_migration_placeholder() {
            tracing::debug!(model = meta.model_name, "skipping schema validation for migration state");
            return Ok(());
        }

        let schema = source.load()?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            FieldError::InvalidSchema(format!("{}: {e}", source.describe()))
        })?;

        let result = match validator.iter_errors(payload).next() {
            None => Ok(()),
            Some(err) => Err(ValidationError::new(err.to_string(), "invalid")
                .with_param("value", payload.to_string())
                .with_param("path", err.instance_path.to_string())
                .into()),
        };
        result
    }

    fn check_keys(allowed: &BTreeSet<String>, payload: &serde_json::Value) -> FieldResult<()> {
        let expected = format_keys(allowed);
        let Some(object) = payload.as_object() else {
            return Err(ValidationError::new("Value must be a JSON object.", "invalid_type")
                .with_param("value", payload.to_string())
                .with_param("expected", expected)
                .into());
        };

        let keys: BTreeSet<&str> = object.keys().map(String::as_str).collect();
        if keys.iter().copied().eq(allowed.iter().map(String::as_str)) {
            return Ok(());
        }
        Err(
            ValidationError::new(format!("Must have exactly the keys {expected}."), "invalid_keys")
                .with_param("value", payload.to_string())
                .with_param("expected", expected)
                .into(),
        )
    }
}

fn format_keys(keys: &BTreeSet<String>) -> String {
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    format!("[{}]", keys.join(", "))
}

fn payload_of(value: &Value) -> FieldResult<serde_json::Value> {
    match value {
        Value::Json(j) => Ok(j.clone()),
        Value::String(s) => Ok(serde_json::from_str(s)?),
        other => Ok(other.to_json()),
    }
}

impl FieldHooks for EnforcedKeyJson {
    fn on_before_write(
        &self,
        field: &FieldDef,
        record: &mut dyn ModelRecord,
        _add: bool,
    ) -> FieldResult<Value> {
        let value = record.get_value(field.name).unwrap_or(Value::Null);
        if !value.is_null() {
            self.enforce(&payload_of(&value)?, record.record_meta())
                .inspect_err(|e| tracing::warn!(field = field.name, error = %e, "rejected payload on save"))?;
        }
        Ok(value)
    }

    fn on_after_read(&self, field: &FieldDef, meta: &ModelMeta, value: Value) -> FieldResult<Value> {
        let value = match value {
            Value::String(s) => Value::Json(serde_json::from_str(&s)?),
            other => other,
        };
        if self.read_time_validate && !value.is_null() {
            self.enforce(&payload_of(&value)?, meta)
                .inspect_err(|e| tracing::warn!(field = field.name, error = %e, "stored payload failed validation"))?;
        }
        Ok(value)
    }

    fn on_validate(&self, field: &FieldDef, value: &Value, meta: &ModelMeta) -> FieldResult<()> {
        if value.is_null() {
            if field.null {
                return Ok(());
            }
            return Err(ValidationError::new("This field cannot be null.", "null").into());
        }
        self.enforce(&payload_of(value)?, meta)
    }

    fn deconstruct(&self, field: &FieldDef) -> FieldDeconstruction {
        let d = FieldDeconstruction::new(field, "kfields_db::fields::EnforcedKeyJsonField");
        let d = match &self.enforcement {
            Enforcement::None => d,
            Enforcement::Full(source) => d.kwarg("full", true).kwarg("schema", source.describe()),
            Enforcement::Partial(keys) => d
                .kwarg("partial", true)
                .kwarg("allowed_keys", keys.iter().cloned().collect::<Vec<_>>()),
        };
        let d = if field.null { d.kwarg("null", true) } else { d };
        if self.read_time_validate {
            d.kwarg("read_time_validate", true)
        } else {
            d
        }
    }
}
