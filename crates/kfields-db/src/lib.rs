//! # kfields-db
//!
//! ORM field layer for kfields. Provides the [`Model`](model::Model) trait,
//! field definitions with lifecycle hooks, and the three custom fields:
//! [`KIdxField`](fields::KIdxField), [`CreatedDateField`](fields::CreatedDateField)
//! and [`EnforcedKeyJsonField`](fields::EnforcedKeyJsonField).
//!
//! ## Architecture
//!
//! A field is a [`FieldDef`](fields::FieldDef) with an optional
//! [`FieldHooks`](fields::FieldHooks) implementation attached. The
//! [`executor`] functions call those hooks at fixed points of a model's life:
//! before a write, after a read, and during `full_clean`. SQL is produced by
//! [`SqlCompiler`](compiler::SqlCompiler) and run through any
//! [`DbExecutor`](executor::DbExecutor).
//!
//! ## Module Overview
//!
//! - [`model`] - The [`Model`](model::Model) trait and [`ModelMeta`](model::ModelMeta)
//! - [`fields`] - Field definitions, hooks, and the custom fields
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`row`] - Result rows and typed column access
//! - [`compiler`] - SQL for table creation, INSERT, UPDATE and SELECT
//! - [`executor`] - The create/save/get/clean lifecycle
//! - [`validators`] - Field validators

// These clippy lints are intentionally allowed for the ORM crate:
// - struct_excessive_bools: FieldDef mirrors Django's field API which uses many booleans
// - result_large_err: FieldError is the crate error type and should be used consistently
// - doc_markdown: backtick requirements for documentation items are too strict
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]

pub mod compiler;
pub mod executor;
pub mod fields;
pub mod model;
pub mod row;
pub mod validators;
pub mod value;

pub use compiler::{DatabaseBackendType, SqlCompiler};
pub use executor::{create_model, create_table, full_clean, get_model, save_model, DbExecutor};
pub use fields::{CreatedDateField, EnforcedKeyJsonField, FieldDef, FieldHooks, FieldType, KIdxField, SchemaSource};
pub use model::{Model, ModelMeta, ModelRecord};
pub use row::Row;
pub use value::Value;
