//! The lifecycle interface custom fields implement.
//!
//! Django custom fields override `pre_save`, `from_db_value`, and `validate`.
//! Here those become the three methods of [`FieldHooks`], registered on a
//! [`FieldDef`] and called by the executor:
//!
//! | hook | Django | called from |
//! |---|---|---|
//! | [`on_before_write`](FieldHooks::on_before_write) | `pre_save` | `create_model`, `save_model` |
//! | [`on_after_read`](FieldHooks::on_after_read) | `from_db_value` | `get_model` |
//! | [`on_validate`](FieldHooks::on_validate) | `validate` | `full_clean` |

use std::fmt;

use kfields_core::FieldResult;

use crate::fields::FieldDef;
use crate::model::{ModelMeta, ModelRecord};
use crate::value::Value;

/// Interceptors a field contributes to the storage pipeline.
///
/// Every method has a pass-through default, so a field implements only the
/// hooks it needs. Hooks hold only their definition-time configuration; they
/// keep no state between calls.
pub trait FieldHooks: Send + Sync + fmt::Debug {
    /// Returns the value to write for this field, just before the record is
    /// serialized for an INSERT (`add == true`) or UPDATE.
    ///
    /// Hooks that generate a value write it back to `record` so the in-memory
    /// instance matches what is stored.
    fn on_before_write(
        &self,
        field: &FieldDef,
        record: &mut dyn ModelRecord,
        add: bool,
    ) -> FieldResult<Value> {
        let _ = add;
        Ok(record.get_value(field.name).unwrap_or(Value::Null))
    }

    /// Converts a value loaded from storage into its in-memory form.
    fn on_after_read(&self, field: &FieldDef, meta: &ModelMeta, value: Value) -> FieldResult<Value> {
        let _ = (field, meta);
        Ok(value)
    }

    /// Validates a value as part of `full_clean`.
    fn on_validate(&self, field: &FieldDef, value: &Value, meta: &ModelMeta) -> FieldResult<()> {
        let _ = (field, value, meta);
        Ok(())
    }

    /// Describes the field's constructor arguments, for writing the field
    /// definition out (for example into a migration file).
    fn deconstruct(&self, field: &FieldDef) -> FieldDeconstruction;
}

/// The serializable description of a field returned by
/// [`FieldHooks::deconstruct`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldDeconstruction {
    /// The field's attribute name.
    pub name: String,
    /// The path of the field type (e.g. `kfields_db::fields::KIdxField`).
    pub path: String,
    /// Keyword arguments needed to rebuild the field.
    pub kwargs: serde_json::Map<String, serde_json::Value>,
}

impl FieldDeconstruction {
    /// Starts a deconstruction for `field` of type `path`.
    pub fn new(field: &FieldDef, path: &str) -> Self {
        Self {
            name: field.name.to_string(),
            path: path.to_string(),
            kwargs: serde_json::Map::new(),
        }
    }

    /// Adds a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }
}
