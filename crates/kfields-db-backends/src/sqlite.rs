//! SQLite database backend using `rusqlite`.
//!
//! This module provides the [`SqliteBackend`] which implements both
//! [`DatabaseBackend`](crate::base::DatabaseBackend) and
//! [`DbExecutor`](kfields_db::DbExecutor) using `rusqlite` wrapped in
//! `tokio::task::spawn_blocking` for async compatibility.
//!
//! Features:
//! - WAL mode enabled for file databases
//! - In-memory database support via `:memory:` path (great for testing)
//! - Constraint violations (such as a colliding `KIdxField` value) surface as
//!   [`FieldError::IntegrityError`]

use std::path::PathBuf;
use std::sync::Arc;

use kfields_core::{FieldError, FieldResult};
use kfields_db::{DatabaseBackendType, DbExecutor, Row, Value};
use tokio::sync::Mutex;

use crate::base::DatabaseBackend;

/// A SQLite database backend.
///
/// Uses `rusqlite` for database access with a `Mutex`-based concurrency
/// model. All operations are run via `tokio::task::spawn_blocking` to
/// avoid blocking the async runtime.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Maps a `rusqlite` error, keeping constraint violations distinct.
fn sqlite_err(e: rusqlite::Error) -> FieldError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            FieldError::IntegrityError(e.to_string())
        }
        _ => FieldError::DatabaseError(e.to_string()),
    }
}

fn join_err(e: tokio::task::JoinError) -> FieldError {
    FieldError::DatabaseError(format!("Task join error: {e}"))
}

impl SqliteBackend {
    /// Opens a new SQLite database at the given path.
    ///
    /// If the path is `:memory:`, an in-memory database is created.
    /// WAL journal mode is enabled for file-based databases.
    pub fn open(path: impl Into<PathBuf>) -> FieldResult<Self> {
        let path = path.into();
        let in_memory = path.to_str() == Some(":memory:");
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| FieldError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| FieldError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database (convenience constructor).
    pub fn memory() -> FieldResult<Self> {
        Self::open(":memory:")
    }

    /// Returns the database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Binds ORM `Value` types to a `rusqlite` statement.
    ///
    /// Dates are stored as ISO-8601 text and JSON as its serialized form.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> FieldResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string().as_str()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string().as_str()),
                Value::DateTimeTz(dt) => stmt.raw_bind_parameter(idx, dt.to_rfc3339().as_str()),
                Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string().as_str()),
            }
            .map_err(|e| FieldError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite::Row` to our generic `Row`.
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> Row {
        let values: Vec<Value> = (0..column_names.len())
            .map(|i| {
                match sqlite_row.get_ref(i).unwrap_or(rusqlite::types::ValueRef::Null) {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
                    rusqlite::types::ValueRef::Real(v) => Value::Float(v),
                    rusqlite::types::ValueRef::Text(b) => {
                        Value::String(String::from_utf8_lossy(b).to_string())
                    }
                    rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
                }
            })
            .collect();

        Row::new(column_names.to_vec(), values)
    }

    async fn run_insert(&self, sql: &str, params: &[Value]) -> FieldResult<Value> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;
            Self::bind_params(&mut stmt, &params)?;
            stmt.raw_execute().map_err(sqlite_err)?;
            Ok(Value::Int(conn.last_insert_rowid()))
        })
        .await
        .map_err(join_err)?
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for SqliteBackend {
    fn vendor(&self) -> &str {
        "sqlite"
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> FieldResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt.raw_execute().map_err(sqlite_err)?;
            Ok(count as u64)
        })
        .await
        .map_err(join_err)?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> FieldResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;

            let column_names: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();

            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows.next().map_err(sqlite_err)? {
                rows.push(Self::convert_row(row, &column_names));
            }
            Ok(rows)
        })
        .await
        .map_err(join_err)?
    }
}

#[async_trait::async_trait]
impl DbExecutor for SqliteBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FieldResult<u64> {
        self.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> FieldResult<Vec<Row>> {
        DatabaseBackend::query(self, sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FieldResult<Value> {
        self.run_insert(sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_memory_open() {
        let backend = SqliteBackend::memory().unwrap();
        assert_eq!(backend.vendor(), "sqlite");
        assert_eq!(DatabaseBackend::backend_type(&backend), DatabaseBackendType::SQLite);
    }

    #[tokio::test]
    async fn test_sqlite_insert_and_query() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT, made TEXT)", &[])
            .await
            .unwrap();

        let id = backend
            .insert_returning_id(
                "INSERT INTO notes (body, made) VALUES (?, ?)",
                &[
                    Value::Json(serde_json::json!({"a": 1})),
                    Value::Date(chrono_date()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(id, Value::Int(1));

        let rows = DatabaseBackend::query(&backend, "SELECT body, made FROM notes", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<serde_json::Value>("body").unwrap(), serde_json::json!({"a": 1}));
        assert_eq!(rows[0].get::<String>("made").unwrap(), "2024-02-29");
    }

    fn chrono_date() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    }

    #[tokio::test]
    async fn test_unique_violation_is_integrity_error() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute("CREATE TABLE t (code TEXT NOT NULL UNIQUE)", &[])
            .await
            .unwrap();
        backend
            .execute("INSERT INTO t (code) VALUES (?)", &[Value::from("ID24AAAA")])
            .await
            .unwrap();
        let err = backend
            .execute("INSERT INTO t (code) VALUES (?)", &[Value::from("ID24AAAA")])
            .await
            .unwrap_err();
        assert!(matches!(err, FieldError::IntegrityError(_)), "{err}");
    }

    #[tokio::test]
    async fn test_syntax_error_is_database_error() {
        let backend = SqliteBackend::memory().unwrap();
        let err = backend.execute("SELEKT 1", &[]).await.unwrap_err();
        assert!(matches!(err, FieldError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kfields.db");
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.path(), &path);
        backend.execute("CREATE TABLE t (x INTEGER)", &[]).await.unwrap();
        assert!(path.exists());
    }
}
