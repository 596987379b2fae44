//! # kfields-db-backends
//!
//! Database backend implementations for kfields. A backend executes the SQL
//! produced by [`kfields_db::SqlCompiler`] and implements
//! [`kfields_db::DbExecutor`], so models using the custom fields can be
//! created, saved, and loaded through it.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)

#![allow(clippy::doc_markdown)]
#![allow(clippy::result_large_err)]

pub mod base;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::{DatabaseBackend, DatabaseConfig};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

/// Opens a backend for the given configuration.
#[cfg(feature = "sqlite")]
pub fn connect(config: &DatabaseConfig) -> kfields_core::FieldResult<Box<dyn kfields_db::DbExecutor>> {
    match config.backend {
        kfields_db::DatabaseBackendType::SQLite => Ok(Box::new(SqliteBackend::open(&config.name)?)),
        other => Err(kfields_core::FieldError::ConfigurationError(format!(
            "No driver compiled in for {other:?}"
        ))),
    }
}
