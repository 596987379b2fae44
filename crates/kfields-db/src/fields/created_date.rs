//! `CreatedDateField`: the local calendar date a record was created.
//!
//! The date is taken from the record's creation timestamp (by default the
//! `created_on` attribute) when it has one, otherwise from `now()`. It is set
//! once and never recomputed.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use kfields_core::{timezone, FieldError, FieldResult};

use crate::fields::hooks::{FieldDeconstruction, FieldHooks};
use crate::fields::{FieldDef, FieldType};
use crate::model::{ModelMeta, ModelRecord};
use crate::value::Value;

/// Default name of the timestamp attribute the date is derived from.
pub const DEFAULT_CREATED_SOURCE: &str = "created_on";

/// An indexed, non-editable `DateField` filled on first save.
///
/// # Examples
///
/// ```
/// use kfields_db::fields::CreatedDateField;
///
/// let def = CreatedDateField::new().source("inserted_at").build("created_date").unwrap();
/// assert!(def.db_index);
/// assert!(!def.editable);
/// ```
#[derive(Debug, Clone)]
pub struct CreatedDateField {
    source: &'static str,
}

impl Default for CreatedDateField {
    fn default() -> Self {
        Self::new()
    }
}

impl CreatedDateField {
    /// Creates a field reading from the `created_on` attribute.
    pub const fn new() -> Self {
        Self {
            source: DEFAULT_CREATED_SOURCE,
        }
    }

    /// Sets the timestamp attribute the date is derived from.
    #[must_use]
    pub const fn source(mut self, source: &'static str) -> Self {
        self.source = source;
        self
    }

    /// Produces the field definition.
    pub fn build(self, name: &'static str) -> FieldResult<FieldDef> {
        if self.source == name {
            return Err(FieldError::ConfigurationError(format!(
                "CreatedDateField '{name}' cannot derive its value from itself"
            )));
        }
        Ok(FieldDef::new(name, FieldType::DateField)
            .db_index()
            .blank()
            .not_editable()
            .with_hooks(Arc::new(self)))
    }

    /// Resolves the local date for a record's creation timestamp, falling back
    /// to today when the timestamp is missing or empty.
    pub fn resolve(&self, record: &dyn ModelRecord) -> FieldResult<NaiveDate> {
        let created = record.get_value(self.source).unwrap_or(Value::Null);
        if let Value::Date(date) = created {
            return Ok(date);
        }
        Ok(timestamp_of(&created)?.map_or_else(timezone::today, |dt| timezone::localdate(&dt)))
    }
}

/// Interprets a timestamp value. Naive datetimes are taken to be UTC.
fn timestamp_of(value: &Value) -> FieldResult<Option<DateTime<FixedOffset>>> {
    let utc = |dt: DateTime<Utc>| dt.fixed_offset();
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::DateTimeTz(dt) => Ok(Some(utc(*dt))),
        Value::DateTime(dt) => Ok(Some(utc(dt.and_utc()))),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .map(|dt| utc(dt.and_utc()))
            })
            .map(Some)
            .map_err(|e| FieldError::DatabaseError(format!("Invalid creation timestamp '{s}': {e}"))),
        other => Err(FieldError::DatabaseError(format!(
            "Unsupported creation timestamp value: {other:?}"
        ))),
    }
}

impl FieldHooks for CreatedDateField {
    fn on_before_write(
        &self,
        field: &FieldDef,
        record: &mut dyn ModelRecord,
        _add: bool,
    ) -> FieldResult<Value> {
        let current = record.get_value(field.name).unwrap_or(Value::Null);
        if !current.is_empty() {
            return Ok(current);
        }

        let date = self.resolve(record)?;
        tracing::debug!(field = field.name, source = self.source, %date, "derived created date");
        let value = Value::Date(date);
        record.set_value(field.name, value.clone())?;
        Ok(value)
    }

    fn on_after_read(&self, _field: &FieldDef, _meta: &ModelMeta, value: Value) -> FieldResult<Value> {
        match value {
            Value::String(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| FieldError::DatabaseError(format!("Invalid stored date '{s}': {e}"))),
            other => Ok(other),
        }
    }

    fn deconstruct(&self, field: &FieldDef) -> FieldDeconstruction {
        let d = FieldDeconstruction::new(field, "kfields_db::fields::CreatedDateField");
        if self.source == DEFAULT_CREATED_SOURCE {
            d
        } else {
            d.kwarg("source", self.source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_field_def() {
        let def = CreatedDateField::new().build("created_date").unwrap();
        assert_eq!(def.field_type, FieldType::DateField);
        assert!(def.db_index && !def.editable);
    }

    #[test]
    fn test_build_rejects_self_source() {
        let err = CreatedDateField::new().source("day").build("day").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_timestamp_of_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap().fixed_offset();
        assert_eq!(timestamp_of(&Value::Null).unwrap(), None);
        assert_eq!(timestamp_of(&Value::String(String::new())).unwrap(), None);
        assert_eq!(
            timestamp_of(&Value::DateTimeTz(expected.with_timezone(&Utc))).unwrap(),
            Some(expected)
        );
        assert_eq!(
            timestamp_of(&Value::String("2024-02-29T23:30:00Z".into())).unwrap(),
            Some(expected)
        );
        assert_eq!(
            timestamp_of(&Value::String("2024-02-29 23:30:00".into())).unwrap(),
            Some(expected)
        );
        assert!(timestamp_of(&Value::String("yesterday".into())).is_err());
        assert!(timestamp_of(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_after_read_parses_text_dates() {
        let field = CreatedDateField::new();
        let def = FieldDef::new("created_date", FieldType::DateField);
        let meta = ModelMeta::new("shop", "order", vec![]);
        let v = field
            .on_after_read(&def, &meta, Value::String("2023-07-04".into()))
            .unwrap();
        assert_eq!(v, Value::Date(NaiveDate::from_ymd_opt(2023, 7, 4).unwrap()));
        assert_eq!(field.on_after_read(&def, &meta, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_deconstruct_only_reports_custom_source() {
        let def = CreatedDateField::new().build("created_date").unwrap();
        let d = def.hooks.as_ref().unwrap().deconstruct(&def);
        assert!(d.kwargs.is_empty());

        let def = CreatedDateField::new().source("stamped_at").build("created_date").unwrap();
        let d = def.hooks.as_ref().unwrap().deconstruct(&def);
        assert_eq!(d.kwargs.get("source"), Some(&serde_json::json!("stamped_at")));
    }
}
