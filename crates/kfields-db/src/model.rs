//! Model trait and metadata.
//!
//! The [`Model`] trait is what the lifecycle executor works with. Field hooks
//! never see a concrete model type; they get a [`ModelRecord`], the
//! object-safe view every `Model` implements.

use kfields_core::{FieldError, FieldResult};

use crate::fields::FieldDef;
use crate::row::Row;
use crate::value::Value;

/// The module path carried by placeholder models built while generating
/// migrations. Schema validation is skipped for them.
pub const FAKE_MODULE_PATH: &str = "__fake__";

/// The core trait for all ORM models.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
/// use kfields_db::fields::{FieldDef, FieldType, KIdxField};
/// use kfields_db::model::{Model, ModelMeta};
/// use kfields_db::row::Row;
/// use kfields_db::value::Value;
/// use kfields_core::FieldResult;
///
/// struct Order {
///     id: Option<i64>,
///     code: Option<String>,
/// }
///
/// impl Model for Order {
///     fn meta() -> &'static ModelMeta {
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
///             ModelMeta::new("shop", "order", vec![
///                 FieldDef::new("id", FieldType::BigAutoField).primary_key(),
///                 KIdxField::new().build("code").expect("valid kidx options"),
///             ])
///         });
///         &META
///     }
///
///     fn pk(&self) -> Option<Value> { self.id.map(Value::Int) }
///     fn set_pk(&mut self, value: Value) {
///         if let Value::Int(id) = value { self.id = Some(id); }
///     }
///     fn field_values(&self) -> Vec<(&'static str, Value)> {
///         vec![("id", self.id.into()), ("code", self.code.clone().into())]
///     }
///     fn set_field_value(&mut self, name: &str, value: Value) -> FieldResult<()> {
///         match name {
///             "code" => self.code = value.as_str().map(String::from),
///             _ => {}
///         }
///         Ok(())
///     }
///     fn from_row(row: &Row) -> FieldResult<Self> {
///         Ok(Order { id: row.get("id")?, code: row.get("code")? })
///     }
/// }
///
/// assert_eq!(Order::table_name(), "shop_order");
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the database table name.
    fn table_name() -> &'static str {
        &Self::meta().db_table
    }

    /// Returns the primary key value, or `None` if unsaved.
    fn pk(&self) -> Option<Value>;

    /// Sets the primary key value on this instance (used after INSERT).
    fn set_pk(&mut self, value: Value);

    /// Returns the name of the primary key field.
    fn pk_field_name() -> &'static str {
        Self::meta().pk_field().map_or("id", |f| f.name)
    }

    /// Returns all field name-value pairs for this instance.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Assigns one field. Hooks use this to write generated values back.
    fn set_field_value(&mut self, name: &str, value: Value) -> FieldResult<()>;

    /// Constructs a model instance from a database row.
    fn from_row(row: &Row) -> FieldResult<Self>
    where
        Self: Sized;
}

/// The object-safe view of a model instance handed to field hooks.
pub trait ModelRecord {
    /// Returns the metadata of the record's model.
    fn record_meta(&self) -> &'static ModelMeta;

    /// Returns the current value of a field, if the model has it.
    fn get_value(&self, name: &str) -> Option<Value>;

    /// Sets the value of a field.
    fn set_value(&mut self, name: &str, value: Value) -> FieldResult<()>;
}

impl<M: Model> ModelRecord for M {
    fn record_meta(&self) -> &'static ModelMeta {
        M::meta()
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        self.field_values()
            .into_iter()
            .find_map(|(field, value)| (field == name).then_some(value))
    }

    fn set_value(&mut self, name: &str, value: Value) -> FieldResult<()> {
        if M::meta().field(name).is_none() {
            return Err(FieldError::DatabaseError(format!(
                "Model '{}' has no field '{name}'",
                M::meta().model_name
            )));
        }
        self.set_field_value(name, value)
    }
}

/// Metadata about a model, equivalent to Django's `class Meta` plus the
/// model's field list.
#[derive(Debug)]
pub struct ModelMeta {
    /// The application label (e.g. "shop").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g. "order").
    pub model_name: &'static str,
    /// The Rust module the model is defined in, or [`FAKE_MODULE_PATH`].
    pub module_path: &'static str,
    /// The database table name.
    pub db_table: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Field definitions for this model.
    pub fields: Vec<FieldDef>,
}

impl ModelMeta {
    /// Creates metadata with the conventional `{app_label}_{model_name}` table.
    pub fn new(app_label: &'static str, model_name: &'static str, fields: Vec<FieldDef>) -> Self {
        Self {
            app_label,
            model_name,
            module_path: "",
            db_table: format!("{app_label}_{model_name}"),
            verbose_name: model_name.replace('_', " "),
            fields,
        }
    }

    /// Overrides the table name.
    #[must_use]
    pub fn db_table(mut self, table: impl Into<String>) -> Self {
        self.db_table = table.into();
        self
    }

    /// Records the defining module, usually `module_path!()`.
    #[must_use]
    pub const fn module_path(mut self, module_path: &'static str) -> Self {
        self.module_path = module_path;
        self
    }

    /// Returns `true` for placeholder models built during migration
    /// autodetection.
    pub fn is_migration_placeholder(&self) -> bool {
        self.module_path == FAKE_MODULE_PATH
    }

    /// Looks up a field by attribute name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field, if one is declared.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Returns the fields that carry lifecycle hooks.
    pub fn hooked_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.hooks.is_some())
    }
}
