//! Field validators.
//!
//! Validators run inside `full_clean`, before the field's own
//! [`on_validate`](crate::fields::FieldHooks::on_validate) hook.

use std::fmt;

use kfields_core::{FieldResult, ValidationError};

use crate::value::Value;

/// A trait for validating field values.
///
/// # Examples
///
/// ```
/// use kfields_db::validators::{Validator, MaxLengthValidator};
/// use kfields_db::value::Value;
///
/// let v = MaxLengthValidator::new(5);
/// assert!(v.validate(&Value::String("hi".into())).is_ok());
/// assert!(v.validate(&Value::String("toolong".into())).is_err());
/// ```
pub trait Validator: Send + Sync + fmt::Debug {
    /// Validates the given value, returning an error if invalid.
    fn validate(&self, value: &Value) -> FieldResult<()>;

    /// Returns a human-readable name for this validator.
    fn name(&self) -> &str;
}

/// Validates that a string value does not exceed a maximum length.
#[derive(Debug, Clone)]
pub struct MaxLengthValidator {
    /// The maximum allowed length, in characters.
    pub max_length: usize,
}

impl MaxLengthValidator {
    /// Creates a new `MaxLengthValidator` with the given maximum length.
    pub const fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Validator for MaxLengthValidator {
    fn validate(&self, value: &Value) -> FieldResult<()> {
        if let Value::String(s) = value {
            let len = s.chars().count();
            if len > self.max_length {
                return Err(ValidationError::new(
                    format!(
                        "Ensure this value has at most {} characters (it has {len}).",
                        self.max_length
                    ),
                    "max_length",
                )
                .with_param("limit_value", self.max_length.to_string())
                .with_param("value", s.clone())
                .into());
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "MaxLengthValidator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_length_counts_chars() {
        let v = MaxLengthValidator::new(3);
        assert!(v.validate(&Value::String("äöü".into())).is_ok());
        let err = v.validate(&Value::String("abcd".into())).unwrap_err();
        let ve = err.as_validation().unwrap();
        assert_eq!(ve.code, "max_length");
        assert_eq!(ve.param("limit_value"), Some("3"));
    }

    #[test]
    fn test_max_length_ignores_non_strings() {
        let v = MaxLengthValidator::new(1);
        assert!(v.validate(&Value::Int(12345)).is_ok());
        assert!(v.validate(&Value::Null).is_ok());
        assert_eq!(v.name(), "MaxLengthValidator");
    }
}
