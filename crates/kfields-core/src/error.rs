//! Core error types for kfields.
//!
//! [`FieldError`] covers everything that can go wrong while defining a field,
//! running its lifecycle hooks, or talking to storage. Validation failures are
//! carried by [`ValidationError`], which mirrors Django's
//! `django.core.exceptions.ValidationError`.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Represents a validation error with optional field-level errors.
///
/// A validation error is either simple (one message, a code, and parameters
/// such as the offending value) or compound (per-field error lists collected
/// by `full_clean`).
///
/// # Examples
///
/// ```
/// use kfields_core::error::ValidationError;
///
/// let err = ValidationError::new("Must have exactly the keys [a, b].", "invalid_keys")
///     .with_param("value", r#"{"a":1}"#);
/// assert_eq!(err.param("value"), Some(r#"{"a":1}"#));
///
/// let mut field_errors = std::collections::BTreeMap::new();
/// field_errors.insert("payload".to_string(), vec![err]);
/// let compound = ValidationError::with_field_errors(field_errors);
/// assert!(compound.to_string().starts_with("payload: "));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the type of failure (e.g. "invalid", "invalid_keys").
    pub code: String,
    /// Additional parameters, such as the offending `value` or the `expected` keys.
    pub params: BTreeMap<String, String>,
    /// Per-field validation errors, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<Self>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: BTreeMap::new(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: BTreeMap<String, Vec<Self>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            params: BTreeMap::new(),
            field_errors,
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter by name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the errors recorded for one field, if any.
    pub fn errors_for(&self, field: &str) -> &[Self] {
        self.field_errors.get(field).map_or(&[], Vec::as_slice)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            write!(f, "{}", self.message)?;
        } else if !self.field_errors.is_empty() {
            let mut first = true;
            for (field, errors) in &self.field_errors {
                for error in errors {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}: {error}")?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The error type for kfields.
///
/// Configuration and validation errors are raised by the fields themselves.
/// Storage errors come from the backends. File and JSON errors from schema
/// loading propagate unchanged through the `#[from]` conversions.
#[derive(Error, Debug)]
pub enum FieldError {
    // ── Definition ───────────────────────────────────────────────────

    /// A field was defined with missing or contradictory options.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// A value failed field validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Storage ──────────────────────────────────────────────────────

    /// A lookup expected exactly one row but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A lookup expected exactly one row but found several.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A database integrity constraint (UNIQUE, NOT NULL) was violated.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Schema files ─────────────────────────────────────────────────

    /// A schema file could not be read.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A schema file or stored payload is not valid JSON.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A schema document is valid JSON but not a usable JSON Schema.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl FieldError {
    /// Returns the inner [`ValidationError`] if this is a validation failure.
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::ValidationError(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` for errors raised while defining a field.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }
}

impl From<ValidationError> for FieldError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, FieldError>`.
pub type FieldResult<T> = Result<T, FieldError>;
