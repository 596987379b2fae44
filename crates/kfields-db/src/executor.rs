//! Model lifecycle execution.
//!
//! This module connects models, field hooks, and a database. The functions
//! here are where the custom fields take effect:
//!
//! - [`create_model`] and [`save_model`] call every field's
//!   [`on_before_write`](crate::fields::FieldHooks::on_before_write) before
//!   serializing the record.
//! - [`get_model`] passes each loaded column through
//!   [`on_after_read`](crate::fields::FieldHooks::on_after_read) before
//!   [`Model::from_row`].
//! - [`full_clean`] runs validators and
//!   [`on_validate`](crate::fields::FieldHooks::on_validate), collecting the
//!   failures per field.
//!
//! Storage-level failures, such as a UNIQUE violation from a colliding
//! identifier, come back from the [`DbExecutor`] unchanged.

use std::collections::BTreeMap;

use kfields_core::logging::model_span;
use kfields_core::{FieldError, FieldResult, ValidationError};
use tracing::Instrument;

use crate::compiler::{DatabaseBackendType, SqlCompiler};
use crate::fields::FieldDef;
use crate::model::{Model, ModelMeta, ModelRecord};
use crate::row::Row;
use crate::validators::{MaxLengthValidator, Validator};
use crate::value::Value;

/// Minimal async database executor trait.
///
/// Backends (see `kfields-db-backends`) implement this so the lifecycle
/// functions can run without depending on a concrete driver.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Returns the backend type for SQL compilation.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Runs a SQL statement that does not return rows.
    /// Returns the number of rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FieldResult<u64>;

    /// Runs a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> FieldResult<Vec<Row>>;

    /// Runs a SQL query and returns exactly one row.
    async fn query_one(&self, sql: &str, params: &[Value]) -> FieldResult<Row> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            0 => Err(FieldError::DoesNotExist("No rows returned".to_string())),
            1 => Ok(rows.remove(0)),
            n => Err(FieldError::MultipleObjectsReturned(format!(
                "Expected 1 row, got {n}"
            ))),
        }
    }

    /// Executes an INSERT and returns the new row's primary key.
    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FieldResult<Value>;
}

fn compiler(db: &dyn DbExecutor) -> SqlCompiler {
    SqlCompiler::new(db.backend_type())
}

/// Creates the table (and indexes) for a model.
pub async fn create_table(meta: &ModelMeta, db: &dyn DbExecutor) -> FieldResult<()> {
    for sql in compiler(db).compile_create_table(meta) {
        db.execute_sql(&sql, &[]).await?;
    }
    tracing::debug!(table = %meta.db_table, "created table");
    Ok(())
}

/// Collects the column values to write, running before-write hooks.
///
/// Auto-incrementing primary keys are left to the database. On UPDATE the
/// primary key is never part of the SET list.
fn values_for_write<M: Model>(model: &mut M, add: bool) -> FieldResult<Vec<(String, Value)>> {
    let meta = M::meta();
    let mut values = Vec::with_capacity(meta.fields.len());
    for field in &meta.fields {
        if field.primary_key && (field.field_type.is_auto() || !add) {
            continue;
        }
        let mut value = match &field.hooks {
            Some(hooks) => hooks.on_before_write(field, model, add)?,
            None => model.get_value(field.name).unwrap_or(Value::Null),
        };
        if value.is_null() {
            if let Some(default) = &field.default {
                value = default.clone();
            }
        }
        values.push((field.column.clone(), value));
    }
    Ok(values)
}

fn as_pairs(values: &[(String, Value)]) -> Vec<(&str, Value)> {
    values.iter().map(|(c, v)| (c.as_str(), v.clone())).collect()
}

fn pk_column(meta: &ModelMeta) -> &str {
    meta.pk_field().map_or("id", |f| f.column.as_str())
}

/// Inserts a new model instance.
///
/// Before-write hooks run with `add == true`. Values they generate are
/// written back to `model`. An auto-incrementing primary key returned by the
/// database is stored with [`Model::set_pk`].
pub async fn create_model<M: Model>(model: &mut M, db: &dyn DbExecutor) -> FieldResult<()> {
    let meta = M::meta();
    let values = values_for_write(model, true)?;
    let (sql, params) = compiler(db).compile_insert(&meta.db_table, &as_pairs(&values));
    let pk = db
        .insert_returning_id(&sql, &params)
        .instrument(model_span("create", &meta.db_table))
        .await?;
    if meta.pk_field().is_some_and(|f| f.field_type.is_auto()) {
        model.set_pk(pk);
    }
    Ok(())
}

/// Saves a model instance: INSERT when it has no primary key, UPDATE otherwise.
///
/// Updating a primary key that matches no row is an error
/// ([`FieldError::DoesNotExist`]).
pub async fn save_model<M: Model>(model: &mut M, db: &dyn DbExecutor) -> FieldResult<()> {
    let Some(pk) = model.pk() else {
        return create_model(model, db).await;
    };

    let meta = M::meta();
    let values = values_for_write(model, false)?;
    let (sql, params) =
        compiler(db).compile_update(&meta.db_table, &as_pairs(&values), pk_column(meta), &pk);
    let updated = db
        .execute_sql(&sql, &params)
        .instrument(model_span("update", &meta.db_table))
        .await?;
    if updated == 0 {
        return Err(FieldError::DoesNotExist(format!(
            "{} with primary key {pk} does not exist",
            meta.model_name
        )));
    }
    Ok(())
}

/// Loads one model instance by primary key.
///
/// Every hooked column passes through its field's after-read hook before the
/// row reaches [`Model::from_row`], so read-time validation failures surface
/// here.
pub async fn get_model<M: Model>(pk: impl Into<Value> + Send, db: &dyn DbExecutor) -> FieldResult<M> {
    let meta = M::meta();
    let (sql, params) = compiler(db).compile_select_by_pk(meta, pk_column(meta), &pk.into());
    let mut row = db
        .query_one(&sql, &params)
        .instrument(model_span("get", &meta.db_table))
        .await?;
    apply_after_read(meta, &mut row)?;
    M::from_row(&row)
}

/// Runs after-read hooks over the hooked columns of a row, in place.
pub fn apply_after_read(meta: &ModelMeta, row: &mut Row) -> FieldResult<()> {
    for field in meta.hooked_fields() {
        let Some(hooks) = &field.hooks else { continue };
        let raw = row.take(&field.column)?;
        let value = hooks.on_after_read(field, meta, raw)?;
        row.set(&field.column, value)?;
    }
    Ok(())
}

/// Validates every field of a model instance.
///
/// Validation failures are collected per field name into one
/// [`ValidationError`]. Any other error, such as an unreadable schema file,
/// is returned immediately.
pub fn full_clean<M: Model>(model: &M) -> FieldResult<()> {
    let meta = M::meta();
    let mut field_errors: BTreeMap<String, Vec<ValidationError>> = BTreeMap::new();

    for field in &meta.fields {
        if field.primary_key && field.field_type.is_auto() {
            continue;
        }
        let value = model.get_value(field.name).unwrap_or(Value::Null);
        for result in clean_field(field, &value, meta) {
            match result {
                FieldError::ValidationError(err) => {
                    field_errors.entry(field.name.to_string()).or_default().push(err);
                }
                other => return Err(other),
            }
        }
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(model = meta.model_name, fields = field_errors.len(), "full_clean failed");
        Err(ValidationError::with_field_errors(field_errors).into())
    }
}

fn clean_field(field: &FieldDef, value: &Value, meta: &ModelMeta) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(hooks) = &field.hooks {
        if let Err(e) = hooks.on_validate(field, value, meta) {
            errors.push(e);
        }
    } else if value.is_empty() && !field.blank && !(field.null && value.is_null()) {
        errors.push(ValidationError::new("This field cannot be blank.", "blank").into());
    }

    if !value.is_empty() {
        if let Some(max) = field.max_length {
            if let Err(e) = MaxLengthValidator::new(max).validate(value) {
                errors.push(e);
            }
        }
        errors.extend(field.validators.iter().filter_map(|v| v.validate(value).err()));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{EnforcedKeyJsonField, FieldType, KIdxField};
    use std::sync::LazyLock;

    #[derive(Debug, Default)]
    struct Ticket {
        id: Option<i64>,
        code: Option<String>,
        title: String,
        extra: Option<serde_json::Value>,
    }

    impl Model for Ticket {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new(
                    "desk",
                    "ticket",
                    vec![
                        FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                        KIdxField::new().build("code").expect("kidx"),
                        FieldDef::new("title", FieldType::CharField).max_length(5),
                        EnforcedKeyJsonField::new()
                            .partial(true)
                            .allowed_keys(["a"])
                            .build("extra")
                            .expect("json"),
                    ],
                )
            });
            &META
        }

        fn pk(&self) -> Option<Value> {
            self.id.map(Value::Int)
        }

        fn set_pk(&mut self, value: Value) {
            if let Value::Int(id) = value {
                self.id = Some(id);
            }
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", self.id.into()),
                ("code", self.code.clone().into()),
                ("title", self.title.clone().into()),
                ("extra", self.extra.clone().into()),
            ]
        }

        fn set_field_value(&mut self, name: &str, value: Value) -> FieldResult<()> {
            if name == "code" {
                self.code = value.as_str().map(String::from);
            }
            Ok(())
        }

        fn from_row(row: &Row) -> FieldResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                code: row.get("code")?,
                title: row.get("title")?,
                extra: row.get("extra")?,
            })
        }
    }

    #[test]
    fn test_values_for_write_generates_and_skips_auto_pk() {
        let mut t = Ticket {
            title: "hi".into(),
            extra: Some(serde_json::json!({"a": 1})),
            ..Ticket::default()
        };
        let values = values_for_write(&mut t, true).unwrap();
        let columns: Vec<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, ["code", "title", "extra"]);
        let code = t.code.clone().unwrap();
        assert!(code.starts_with("ID"));
        assert_eq!(values[0].1, Value::String(code));
    }

    #[test]
    fn test_values_for_write_rejects_bad_payload() {
        let mut t = Ticket {
            extra: Some(serde_json::json!({"b": 1})),
            ..Ticket::default()
        };
        let err = values_for_write(&mut t, true).unwrap_err();
        assert_eq!(err.as_validation().unwrap().code, "invalid_keys");
    }

    #[test]
    fn test_full_clean_collects_per_field() {
        let t = Ticket {
            title: "far too long".into(),
            extra: Some(serde_json::json!({"a": 1, "b": 2})),
            ..Ticket::default()
        };
        let err = full_clean(&t).unwrap_err();
        let ve = err.as_validation().unwrap();
        assert_eq!(ve.errors_for("title")[0].code, "max_length");
        assert_eq!(ve.errors_for("extra")[0].code, "invalid_keys");
        assert!(ve.errors_for("code").is_empty());
    }

    #[test]
    fn test_full_clean_blank_and_null() {
        let t = Ticket::default();
        let err = full_clean(&t).unwrap_err();
        let ve = err.as_validation().unwrap();
        assert_eq!(ve.errors_for("title")[0].code, "blank");
        assert_eq!(ve.errors_for("extra")[0].code, "null");
    }

    #[test]
    fn test_full_clean_ok() {
        let t = Ticket {
            title: "ok".into(),
            extra: Some(serde_json::json!({"a": null})),
            ..Ticket::default()
        };
        assert!(full_clean(&t).is_ok());
    }

    #[test]
    fn test_apply_after_read() {
        let mut row = Row::new(
            vec!["id".into(), "code".into(), "title".into(), "extra".into()],
            vec![
                Value::Int(1),
                Value::from("ID24ABCDEFGH"),
                Value::from("x"),
                Value::from(r#"{"a": 2}"#),
            ],
        );
        apply_after_read(Ticket::meta(), &mut row).unwrap();
        let t = Ticket::from_row(&row).unwrap();
        assert_eq!(t.extra, Some(serde_json::json!({"a": 2})));
        assert_eq!(t.id, Some(1));
    }

    #[derive(Default)]
    struct RecordingDb {
        statements: std::sync::Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait::async_trait]
    impl DbExecutor for RecordingDb {
        fn backend_type(&self) -> DatabaseBackendType {
            DatabaseBackendType::SQLite
        }

        async fn execute_sql(&self, sql: &str, params: &[Value]) -> FieldResult<u64> {
            self.statements.lock().unwrap().push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> FieldResult<Vec<Row>> {
            Ok(vec![])
        }

        async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FieldResult<Value> {
            self.statements.lock().unwrap().push((sql.to_string(), params.to_vec()));
            Ok(Value::Int(42))
        }
    }

    #[tokio::test]
    async fn test_create_then_save_keeps_generated_code() {
        let db = RecordingDb::default();
        let mut t = Ticket {
            title: "hi".into(),
            extra: Some(serde_json::json!({"a": 1})),
            ..Ticket::default()
        };
        save_model(&mut t, &db).await.unwrap();
        assert_eq!(t.id, Some(42));
        let code = t.code.clone().unwrap();

        save_model(&mut t, &db).await.unwrap();
        assert_eq!(t.code.as_deref(), Some(code.as_str()));

        let statements = db.statements.lock().unwrap();
        assert!(statements[0].0.starts_with("INSERT INTO \"desk_ticket\""));
        assert!(statements[1].0.starts_with("UPDATE \"desk_ticket\""));
        assert_eq!(statements[1].1[0], Value::String(code));
        assert_eq!(statements[1].1.last(), Some(&Value::Int(42)));
    }

    #[tokio::test]
    async fn test_get_model_without_rows() {
        let err = get_model::<Ticket>(1_i64, &RecordingDb::default()).await.unwrap_err();
        assert!(matches!(err, FieldError::DoesNotExist(_)));
    }

    #[tokio::test]
    async fn test_create_table_runs_every_statement() {
        let db = RecordingDb::default();
        create_table(Ticket::meta(), &db).await.unwrap();
        let statements = db.statements.lock().unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].0.contains("\"code\" TEXT NOT NULL UNIQUE"));
    }
}
