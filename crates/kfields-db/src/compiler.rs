//! SQL generation for the model lifecycle.
//!
//! The executor only needs a handful of statements: table creation (with the
//! UNIQUE constraints and indexes custom fields ask for), INSERT, UPDATE by
//! primary key, and SELECT by primary key. [`SqlCompiler`] produces them with
//! backend-specific placeholders and column types.

use crate::fields::{FieldDef, FieldType};
use crate::model::ModelMeta;
use crate::value::Value;

/// The type of database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// SQLite (uses `?` placeholders).
    SQLite,
}

/// Compiles lifecycle statements for one backend.
#[derive(Debug, Clone, Copy)]
pub struct SqlCompiler {
    backend: DatabaseBackendType,
}

impl SqlCompiler {
    /// Creates a compiler for the given backend.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    /// Returns the backend this compiler targets.
    pub const fn backend(&self) -> DatabaseBackendType {
        self.backend
    }

    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${index}"),
            DatabaseBackendType::SQLite => "?".to_string(),
        }
    }

    /// Returns the column type for a field.
    pub fn column_type(&self, field: &FieldDef) -> String {
        match self.backend {
            DatabaseBackendType::SQLite => match field.field_type {
                FieldType::AutoField
                | FieldType::BigAutoField
                | FieldType::IntegerField
                | FieldType::BigIntegerField
                | FieldType::BooleanField => "INTEGER".to_string(),
                FieldType::CharField
                | FieldType::TextField
                | FieldType::DateField
                | FieldType::DateTimeField
                | FieldType::JsonField => "TEXT".to_string(),
            },
            DatabaseBackendType::PostgreSQL => match field.field_type {
                FieldType::AutoField => "SERIAL".to_string(),
                FieldType::BigAutoField => "BIGSERIAL".to_string(),
                FieldType::CharField => field
                    .max_length
                    .map_or_else(|| "VARCHAR".to_string(), |n| format!("VARCHAR({n})")),
                FieldType::TextField => "TEXT".to_string(),
                FieldType::IntegerField => "INTEGER".to_string(),
                FieldType::BigIntegerField => "BIGINT".to_string(),
                FieldType::BooleanField => "BOOLEAN".to_string(),
                FieldType::DateField => "DATE".to_string(),
                FieldType::DateTimeField => "TIMESTAMP WITH TIME ZONE".to_string(),
                FieldType::JsonField => "JSONB".to_string(),
            },
        }
    }

    fn column_sql(&self, field: &FieldDef) -> String {
        let mut sql = format!("\"{}\" {}", field.column, self.column_type(field));
        if field.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.backend == DatabaseBackendType::SQLite && field.field_type.is_auto() {
                sql.push_str(" AUTOINCREMENT");
            }
        } else {
            if !field.null {
                sql.push_str(" NOT NULL");
            }
            if field.unique {
                sql.push_str(" UNIQUE");
            }
        }
        sql
    }

    /// Compiles CREATE TABLE plus one CREATE INDEX per `db_index` field.
    pub fn compile_create_table(&self, meta: &ModelMeta) -> Vec<String> {
        let table = &meta.db_table;
        let columns: Vec<String> = meta.fields.iter().map(|f| self.column_sql(f)).collect();
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" ({})",
            columns.join(", ")
        )];
        statements.extend(
            meta.fields
                .iter()
                .filter(|f| f.db_index && !f.unique && !f.primary_key)
                .map(|f| {
                    format!(
                        "CREATE INDEX IF NOT EXISTS \"{table}_{col}_idx\" ON \"{table}\" (\"{col}\")",
                        col = f.column
                    )
                }),
        );
        statements
    }

    /// Compiles an INSERT statement.
    pub fn compile_insert(&self, table: &str, fields: &[(&str, Value)]) -> (String, Vec<Value>) {
        let columns: Vec<String> = fields.iter().map(|(name, _)| format!("\"{name}\"")).collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|i| self.placeholder(i)).collect();
        let params = fields.iter().map(|(_, v)| v.clone()).collect();

        let sql = format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        (sql, params)
    }

    /// Compiles an UPDATE of `fields` for the row whose `pk_column` equals `pk`.
    pub fn compile_update(
        &self,
        table: &str,
        fields: &[(&str, Value)],
        pk_column: &str,
        pk: &Value,
    ) -> (String, Vec<Value>) {
        let set_parts: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("\"{name}\" = {}", self.placeholder(i + 1)))
            .collect();
        let mut params: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
        params.push(pk.clone());

        let sql = format!(
            "UPDATE \"{table}\" SET {} WHERE \"{pk_column}\" = {}",
            set_parts.join(", "),
            self.placeholder(fields.len() + 1)
        );
        (sql, params)
    }

    /// Compiles a SELECT of every column of `meta` for one primary key.
    pub fn compile_select_by_pk(&self, meta: &ModelMeta, pk_column: &str, pk: &Value) -> (String, Vec<Value>) {
        let columns: Vec<String> = meta.fields.iter().map(|f| format!("\"{}\"", f.column)).collect();
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{pk_column}\" = {}",
            columns.join(", "),
            meta.db_table,
            self.placeholder(1)
        );
        (sql, vec![pk.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CreatedDateField, EnforcedKeyJsonField, KIdxField};

    fn meta() -> ModelMeta {
        ModelMeta::new(
            "shop",
            "order",
            vec![
                FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                KIdxField::new().build("code").unwrap(),
                CreatedDateField::new().build("created_date").unwrap(),
                FieldDef::new("created_on", FieldType::DateTimeField).nullable(),
                EnforcedKeyJsonField::new().nullable().build("payload").unwrap(),
            ],
        )
    }

    #[test]
    fn test_sqlite_create_table() {
        let sql = SqlCompiler::new(DatabaseBackendType::SQLite).compile_create_table(&meta());
        assert_eq!(sql.len(), 2);
        assert_eq!(
            sql[0],
            "CREATE TABLE IF NOT EXISTS \"shop_order\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"code\" TEXT NOT NULL UNIQUE, \"created_date\" TEXT NOT NULL, \
             \"created_on\" TEXT, \"payload\" TEXT)"
        );
        assert_eq!(
            sql[1],
            "CREATE INDEX IF NOT EXISTS \"shop_order_created_date_idx\" ON \"shop_order\" (\"created_date\")"
        );
    }

    #[test]
    fn test_postgres_column_types() {
        let c = SqlCompiler::new(DatabaseBackendType::PostgreSQL);
        let m = meta();
        assert_eq!(c.column_type(m.field("code").unwrap()), "VARCHAR(15)");
        assert_eq!(c.column_type(m.field("created_date").unwrap()), "DATE");
        assert_eq!(c.column_type(m.field("payload").unwrap()), "JSONB");
        assert!(c.compile_create_table(&m)[0].contains("\"id\" BIGSERIAL PRIMARY KEY,"));
    }

    #[test]
    fn test_insert_placeholders() {
        let fields = [("code", Value::from("ID24AAAA")), ("payload", Value::Null)];
        let (sql, params) = SqlCompiler::new(DatabaseBackendType::SQLite).compile_insert("t", &fields);
        assert_eq!(sql, "INSERT INTO \"t\" (\"code\", \"payload\") VALUES (?, ?)");
        assert_eq!(params.len(), 2);

        let (sql, _) = SqlCompiler::new(DatabaseBackendType::PostgreSQL).compile_insert("t", &fields);
        assert_eq!(sql, "INSERT INTO \"t\" (\"code\", \"payload\") VALUES ($1, $2)");
    }

    #[test]
    fn test_update_by_pk() {
        let fields = [("code", Value::from("X"))];
        let (sql, params) = SqlCompiler::new(DatabaseBackendType::PostgreSQL).compile_update(
            "t",
            &fields,
            "id",
            &Value::Int(7),
        );
        assert_eq!(sql, "UPDATE \"t\" SET \"code\" = $1 WHERE \"id\" = $2");
        assert_eq!(params, vec![Value::from("X"), Value::Int(7)]);
    }

    #[test]
    fn test_select_by_pk() {
        let (sql, params) = SqlCompiler::new(DatabaseBackendType::SQLite).compile_select_by_pk(
            &meta(),
            "id",
            &Value::Int(3),
        );
        assert_eq!(
            sql,
            "SELECT \"id\", \"code\", \"created_date\", \"created_on\", \"payload\" FROM \"shop_order\" WHERE \"id\" = ?"
        );
        assert_eq!(params, vec![Value::Int(3)]);
    }
}
