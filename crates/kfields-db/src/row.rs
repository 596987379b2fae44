//! Database rows and typed extraction.
//!
//! Backends hand rows to the executor as [`Row`]s. After-read hooks rewrite
//! column values in place (for example parsing JSON text), and models pull
//! typed values out with [`Row::get`].

use chrono::{DateTime, NaiveDate, Utc};
use kfields_core::{FieldError, FieldResult};

use crate::value::Value;

/// A single result row: column names paired with values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn index_of(&self, column: &str) -> FieldResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| FieldError::DatabaseError(format!("Column '{column}' not found in row")))
    }

    /// Returns the raw value of a column.
    pub fn value(&self, column: &str) -> FieldResult<&Value> {
        Ok(&self.values[self.index_of(column)?])
    }

    /// Replaces the value of a column.
    pub fn set(&mut self, column: &str, value: Value) -> FieldResult<()> {
        let idx = self.index_of(column)?;
        self.values[idx] = value;
        Ok(())
    }

    /// Removes and returns the value of a column, leaving NULL behind.
    pub fn take(&mut self, column: &str) -> FieldResult<Value> {
        let idx = self.index_of(column)?;
        Ok(std::mem::replace(&mut self.values[idx], Value::Null))
    }

    /// Gets a typed value by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> FieldResult<T> {
        T::from_value(self.value(column)?)
    }
}

/// Conversion from a [`Value`] to a Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> FieldResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> FieldError {
    FieldError::DatabaseError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| FieldError::DatabaseError(format!("Invalid date '{s}': {e}"))),
            _ => Err(mismatch("Date", value)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::DateTimeTz(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| FieldError::DatabaseError(format!("Invalid datetime '{s}': {e}"))),
            _ => Err(mismatch("DateTimeTz", value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::String(s) => Ok(serde_json::from_str(s)?),
            _ => Err(mismatch("Json", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> FieldResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> FieldResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            vec!["id".into(), "code".into(), "created".into(), "payload".into()],
            vec![
                Value::Int(1),
                Value::String("ID24ABCDEFGH".into()),
                Value::String("2024-05-01".into()),
                Value::Null,
            ],
        )
    }

    #[test]
    fn test_typed_get() {
        let r = row();
        assert_eq!(r.get::<i64>("id").unwrap(), 1);
        assert_eq!(r.get::<String>("code").unwrap(), "ID24ABCDEFGH");
        assert_eq!(
            r.get::<NaiveDate>("created").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(r.get::<Option<serde_json::Value>>("payload").unwrap(), None);
    }

    #[test]
    fn test_missing_column() {
        let err = row().get::<i64>("nope").unwrap_err();
        assert!(err.to_string().contains("Column 'nope' not found"));
    }

    #[test]
    fn test_type_mismatch() {
        assert!(row().get::<i64>("code").is_err());
    }

    #[test]
    fn test_set_and_take() {
        let mut r = row();
        r.set("payload", Value::Json(serde_json::json!({"a": 1}))).unwrap();
        assert_eq!(
            r.get::<serde_json::Value>("payload").unwrap(),
            serde_json::json!({"a": 1})
        );
        assert_eq!(r.take("id").unwrap(), Value::Int(1));
        assert_eq!(r.value("id").unwrap(), &Value::Null);
    }

    #[test]
    fn test_json_from_text() {
        let r = Row::new(vec!["j".into()], vec![Value::String(r#"{"k":true}"#.into())]);
        assert_eq!(r.get::<serde_json::Value>("j").unwrap(), serde_json::json!({"k": true}));
    }

    #[test]
    #[should_panic(expected = "Row column count must match value count")]
    fn test_mismatched_row_panics() {
        let _ = Row::new(vec!["a".into()], vec![]);
    }
}
