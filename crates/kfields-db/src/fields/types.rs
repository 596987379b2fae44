//! Field type definitions.
//!
//! [`FieldType`] decides the column type of a field; [`FieldDef`] captures the
//! rest of its metadata, including the optional [`FieldHooks`] that custom
//! fields register to take part in the save, load, and clean pipelines.

use std::sync::Arc;

use crate::fields::hooks::FieldHooks;
use crate::validators::Validator;
use crate::value::Value;

/// The type of a model field, determining its SQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// Auto-incrementing 32-bit integer primary key.
    AutoField,
    /// Auto-incrementing 64-bit integer primary key.
    BigAutoField,
    /// Variable-length string with a max length.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// 32-bit signed integer.
    IntegerField,
    /// 64-bit signed integer.
    BigIntegerField,
    /// Boolean (true/false).
    BooleanField,
    /// Date without time.
    DateField,
    /// Date and time.
    DateTimeField,
    /// JSON data.
    JsonField,
}

impl FieldType {
    /// Returns `true` for auto-incrementing primary key types.
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::AutoField | Self::BigAutoField)
    }
}

/// Complete definition of a model field.
///
/// Plain fields are built with [`FieldDef::new`] and the builder methods.
/// Custom fields (`KIdxField`, `CreatedDateField`, `EnforcedKeyJsonField`)
/// produce a `FieldDef` from their own `build` method, with their options
/// already applied and their hooks attached.
#[derive(Debug)]
pub struct FieldDef {
    /// The attribute name of this field on the model.
    pub name: &'static str,
    /// The database column name (may differ from `name`).
    pub column: String,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed in the database.
    pub null: bool,
    /// Whether the field may be left blank during validation.
    pub blank: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Whether a UNIQUE constraint is applied.
    pub unique: bool,
    /// Whether a database index should be created.
    pub db_index: bool,
    /// Maximum character length (for CharField).
    pub max_length: Option<usize>,
    /// Human-readable help text.
    pub help_text: String,
    /// Human-readable name for the field.
    pub verbose_name: String,
    /// Validators applied during `full_clean`.
    pub validators: Vec<Box<dyn Validator>>,
    /// Whether the field is editable by users.
    pub editable: bool,
    /// Lifecycle hooks contributed by a custom field.
    pub hooks: Option<Arc<dyn FieldHooks>>,
}

impl FieldDef {
    /// Creates a new `FieldDef` with sensible defaults.
    ///
    /// Only the field name and type are required. All other attributes take
    /// their default values (non-null, no index, editable, no hooks).
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: name.to_string(),
            field_type,
            primary_key: false,
            null: false,
            blank: false,
            default: None,
            unique: false,
            db_index: false,
            max_length: None,
            help_text: String::new(),
            verbose_name: name.replace('_', " "),
            validators: Vec::new(),
            editable: true,
            hooks: None,
        }
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values in the database.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Allows blank values during validation.
    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks this field as having a database index.
    #[must_use]
    pub const fn db_index(mut self) -> Self {
        self.db_index = true;
        self
    }

    /// Marks this field as having a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks this field as not editable by users.
    #[must_use]
    pub const fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the human-readable name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Adds a validator.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Attaches lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn FieldHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::MaxLengthValidator;

    #[test]
    fn test_field_def_defaults() {
        let f = FieldDef::new("created_on", FieldType::DateTimeField);
        assert_eq!(f.column, "created_on");
        assert_eq!(f.verbose_name, "created on");
        assert!(f.editable);
        assert!(!f.unique);
        assert!(f.hooks.is_none());
    }

    #[test]
    fn test_field_def_builder() {
        let f = FieldDef::new("title", FieldType::CharField)
            .column("title_col")
            .max_length(40)
            .unique()
            .db_index()
            .nullable()
            .blank()
            .not_editable()
            .default("untitled")
            .help_text("Shown in listings")
            .validator(MaxLengthValidator::new(40));
        assert_eq!(f.column, "title_col");
        assert_eq!(f.max_length, Some(40));
        assert!(f.unique && f.db_index && f.null && f.blank && !f.editable);
        assert_eq!(f.default, Some(Value::String("untitled".into())));
        assert_eq!(f.validators.len(), 1);
    }

    #[test]
    fn test_auto_types() {
        assert!(FieldType::BigAutoField.is_auto());
        assert!(!FieldType::JsonField.is_auto());
    }
}
