//! # kfields-core
//!
//! Core types shared by the kfields crates. This crate has no ORM
//! dependencies and provides the foundation for the field implementations.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Field settings (prefix map, time zone, logging)
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`timezone`] - Active time zone, `now()`, and local date conversion

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod timezone;

// Re-export the most commonly used types at the crate root.
pub use error::{FieldError, FieldResult, ValidationError};
pub use settings::{KIdxPrefixMap, Settings};
