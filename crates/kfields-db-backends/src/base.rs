//! Base database backend trait and connection configuration.
//!
//! [`DatabaseBackend`] is the driver-facing side of a backend. Every backend
//! also implements [`DbExecutor`](kfields_db::DbExecutor) so the model
//! lifecycle can run on it.

use kfields_core::FieldResult;
use kfields_db::{DatabaseBackendType, Row, SqlCompiler, Value};

/// The core trait for database backends.
///
/// All methods are async because database operations are I/O-bound. Backends
/// with synchronous drivers (like `rusqlite`) wrap their work in
/// `spawn_blocking` to keep the async interface.
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name (e.g., "sqlite").
    fn vendor(&self) -> &str;

    /// Returns the backend type enum for use with the SQL compiler.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> FieldResult<u64>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> FieldResult<Vec<Row>>;

    /// Returns a SQL compiler configured for this backend's dialect.
    fn compiler(&self) -> SqlCompiler {
        SqlCompiler::new(self.backend_type())
    }
}

/// Configuration for connecting to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The backend type.
    pub backend: DatabaseBackendType,
    /// The database name or file path.
    pub name: String,
}

impl DatabaseConfig {
    /// Creates a configuration for an in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self::sqlite_file(":memory:")
    }

    /// Creates a configuration for a SQLite file database.
    pub fn sqlite_file(path: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackendType::SQLite,
            name: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_sqlite_memory() {
        let cfg = DatabaseConfig::sqlite_memory();
        assert_eq!(cfg.backend, DatabaseBackendType::SQLite);
        assert_eq!(cfg.name, ":memory:");
    }

    #[test]
    fn test_database_config_sqlite_file() {
        let cfg = DatabaseConfig::sqlite_file("/tmp/test.db");
        assert_eq!(cfg.name, "/tmp/test.db");
    }
}
