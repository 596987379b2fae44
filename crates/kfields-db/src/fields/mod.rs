//! Field definitions and the custom field types.
//!
//! [`FieldDef`] and [`FieldType`] describe model fields and their column
//! mappings. The custom fields build a `FieldDef` with a [`FieldHooks`]
//! implementation attached:
//!
//! - [`KIdxField`] - short unique identifiers such as `ORD24K7QH2M9X`
//! - [`CreatedDateField`] - the local date a record was created
//! - [`EnforcedKeyJsonField`] - JSON checked against a schema or a key set

pub mod created_date;
pub mod enforced_json;
pub mod hooks;
pub mod kidx;
pub mod types;

pub use created_date::CreatedDateField;
pub use enforced_json::{EnforcedKeyJson, EnforcedKeyJsonField, Enforcement, SchemaSource};
pub use hooks::{FieldDeconstruction, FieldHooks};
pub use kidx::{KIdxField, KIDX_ALPHABET};
pub use types::{FieldDef, FieldType};
