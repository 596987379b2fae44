//! # kfields
//!
//! Custom ORM fields: short unique identifiers, creation dates, and JSON
//! columns with enforced keys.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `kfields` to get everything, or on individual crates for
//! finer-grained control.

/// Error types, settings, logging, and time zone helpers.
pub use kfields_core as core;

/// Models, field definitions, hooks, and the model lifecycle.
pub use kfields_db as db;

/// Database backends.
pub use kfields_db_backends as db_backends;

/// Third-party crates used in the public API.
pub use async_trait;
pub use chrono;
pub use serde_json;
pub use tokio;
pub use tracing;

/// The commonly used types in one import.
///
/// ```
/// use kfields::prelude::*;
///
/// let code = KIdxField::new().build("code").unwrap();
/// assert!(code.unique);
/// ```
pub mod prelude {
    pub use kfields_core::{FieldError, FieldResult, KIdxPrefixMap, Settings, ValidationError};
    pub use kfields_db::row::Row;
    pub use kfields_db::{
        create_model, create_table, full_clean, get_model, save_model, CreatedDateField, DbExecutor,
        EnforcedKeyJsonField, FieldDef, FieldHooks, FieldType, KIdxField, Model, ModelMeta, SchemaSource,
        Value,
    };
    #[cfg(feature = "sqlite")]
    pub use kfields_db_backends::SqliteBackend;
}
