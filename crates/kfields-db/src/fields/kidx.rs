//! `KIdxField`: short, human-friendly unique identifiers.
//!
//! On first save a record without a value gets `{PREFIX}{YY}{RANDOM}`, for
//! example `ORD24K7QH2M9X`. The prefix comes from a [`KIdxPrefixMap`] keyed by
//! table name, `YY` is the current local year, and the random part is drawn
//! from [`KIDX_ALPHABET`].
//!
//! Uniqueness is the UNIQUE constraint's job. A collision surfaces as an
//! `IntegrityError` from the backend and is not retried here.

use std::sync::Arc;

use chrono::Datelike;
use kfields_core::settings::{KIdxPrefixMap, Settings};
use kfields_core::{timezone, FieldError, FieldResult};
use rand::Rng;

use crate::fields::hooks::{FieldDeconstruction, FieldHooks};
use crate::fields::{FieldDef, FieldType};
use crate::model::ModelRecord;
use crate::value::Value;

/// Symbols used for the random part: the 36 uppercase letters and digits
/// minus 0, O, 1, I, and L, which leaves 31 symbols (31^length codes).
pub const KIDX_ALPHABET: &str = "23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Default length of the random part.
pub const DEFAULT_KIDX_LENGTH: usize = 8;

/// Default column width.
pub const DEFAULT_KIDX_MAX_LENGTH: usize = 15;

/// A `CharField` that fills itself with a generated short identifier.
///
/// The resulting field is always unique, never editable, and may be left
/// blank during validation (the value is generated at save time).
///
/// # Examples
///
/// ```
/// use kfields_core::settings::KIdxPrefixMap;
/// use kfields_db::fields::KIdxField;
///
/// let field = KIdxField::new()
///     .length(6)
///     .prefixes(KIdxPrefixMap::from_pairs([("shop_order", "ORD")]).unwrap());
/// let id = field.generate("ORD");
/// assert_eq!(id.len(), 3 + 2 + 6);
///
/// let def = field.build("code").unwrap();
/// assert!(def.unique);
/// assert!(!def.editable);
/// ```
#[derive(Debug, Clone)]
pub struct KIdxField {
    length: usize,
    max_length: usize,
    prefixes: KIdxPrefixMap,
}

impl Default for KIdxField {
    fn default() -> Self {
        Self::new()
    }
}

impl KIdxField {
    /// Creates a field with the default length, width, and an empty prefix map.
    pub fn new() -> Self {
        Self {
            length: DEFAULT_KIDX_LENGTH,
            max_length: DEFAULT_KIDX_MAX_LENGTH,
            prefixes: KIdxPrefixMap::new(),
        }
    }

    /// Creates a field using the prefix map from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new().prefixes(settings.kidx_model_map.clone())
    }

    /// Sets the length of the random part.
    #[must_use]
    pub const fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Sets the column width.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Sets the table name to prefix map.
    #[must_use]
    pub fn prefixes(mut self, prefixes: KIdxPrefixMap) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Checks the options and produces the field definition.
    pub fn build(self, name: &'static str) -> FieldResult<FieldDef> {
        if self.length == 0 {
            return Err(FieldError::ConfigurationError(format!(
                "KIdxField '{name}': length must be at least 1"
            )));
        }
        self.prefixes.validate()?;
        let widest = self.prefixes.longest_prefix_len() + 2 + self.length;
        if widest > self.max_length {
            return Err(FieldError::ConfigurationError(format!(
                "KIdxField '{name}': max_length {} cannot hold a {widest}-character identifier",
                self.max_length
            )));
        }

        let max_length = self.max_length;
        Ok(FieldDef::new(name, FieldType::CharField)
            .max_length(max_length)
            .unique()
            .blank()
            .not_editable()
            .with_hooks(Arc::new(self)))
    }

    /// Returns the prefix configured for `table`, or `"ID"`.
    pub fn prefix_for(&self, table: &str) -> &str {
        self.prefixes.prefix_for(table)
    }

    /// Generates an identifier for `prefix` using the current local year.
    pub fn generate(&self, prefix: &str) -> String {
        self.generate_with_rng(&mut rand::thread_rng(), prefix, timezone::today().year())
    }

    /// Generates an identifier with an explicit random source and year.
    pub fn generate_with_rng<R: Rng + ?Sized>(&self, rng: &mut R, prefix: &str, year: i32) -> String {
        let alphabet = KIDX_ALPHABET.as_bytes();
        let code: String = (0..self.length)
            .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
            .collect();
        format!("{prefix}{:02}{code}", year.rem_euclid(100)).to_uppercase()
    }
}

impl FieldHooks for KIdxField {
    fn on_before_write(
        &self,
        field: &FieldDef,
        record: &mut dyn ModelRecord,
        _add: bool,
    ) -> FieldResult<Value> {
        let current = record.get_value(field.name).unwrap_or(Value::Null);
        if !current.is_empty() {
            return Ok(current);
        }

        let table = &record.record_meta().db_table;
        let id = self.generate(self.prefix_for(table));
        tracing::debug!(field = field.name, table = %table, id = %id, "generated kidx");
        let value = Value::String(id);
        record.set_value(field.name, value.clone())?;
        Ok(value)
    }

    fn deconstruct(&self, field: &FieldDef) -> FieldDeconstruction {
        FieldDeconstruction::new(field, "kfields_db::fields::KIdxField")
            .kwarg("length", self.length)
            .kwarg("max_length", self.max_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_alphabet_has_no_ambiguous_symbols() {
        for c in ['0', 'O', '1', 'I', 'L'] {
            assert!(!KIDX_ALPHABET.contains(c), "{c} should be excluded");
        }
        assert_eq!(KIDX_ALPHABET.len(), 31);
    }

    #[test]
    fn test_generate_shape() {
        let field = KIdxField::new();
        let mut rng = StdRng::seed_from_u64(7);
        let id = field.generate_with_rng(&mut rng, "ord", 2024);
        assert_eq!(id.len(), 3 + 2 + 8);
        assert!(id.starts_with("ORD24"));
        assert!(id[5..].chars().all(|c| KIDX_ALPHABET.contains(c)));
    }

    #[test]
    fn test_year_is_zero_padded() {
        let field = KIdxField::new().length(4);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(field.generate_with_rng(&mut rng, "ID", 2005).starts_with("ID05"));
    }

    #[test]
    fn test_same_seed_same_code() {
        let field = KIdxField::new();
        let a = field.generate_with_rng(&mut StdRng::seed_from_u64(42), "ID", 2024);
        let b = field.generate_with_rng(&mut StdRng::seed_from_u64(42), "ID", 2024);
        assert_eq!(a, b);
    }

    #[test]
    fn test_consecutive_codes_differ() {
        let field = KIdxField::new().length(12);
        let mut rng = StdRng::seed_from_u64(99);
        let a = field.generate_with_rng(&mut rng, "ID", 2024);
        let b = field.generate_with_rng(&mut rng, "ID", 2024);
        assert_ne!(a, b);
    }

    #[test]
    fn test_build_rejects_too_narrow_column() {
        let prefixes = KIdxPrefixMap::from_pairs([("crm_lead", "LEAD")]).unwrap();
        let err = KIdxField::new()
            .length(10)
            .prefixes(prefixes)
            .build("code")
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("cannot hold a 16-character identifier"));
    }

    #[test]
    fn test_build_rejects_zero_length() {
        assert!(KIdxField::new().length(0).build("code").unwrap_err().is_configuration());
    }

    #[test]
    fn test_build_field_def() {
        let def = KIdxField::new().build("code").unwrap();
        assert_eq!(def.field_type, FieldType::CharField);
        assert_eq!(def.max_length, Some(DEFAULT_KIDX_MAX_LENGTH));
        assert!(def.unique && def.blank && !def.editable);
        assert!(def.default.is_none());
        assert!(def.hooks.is_some());
    }

    #[test]
    fn test_deconstruct_reports_length() {
        let def = KIdxField::new().length(6).build("code").unwrap();
        let d = def.hooks.as_ref().unwrap().deconstruct(&def);
        assert_eq!(d.name, "code");
        assert_eq!(d.kwargs.get("length"), Some(&serde_json::json!(6)));
        assert!(!d.kwargs.contains_key("default"));
    }

    #[test]
    fn test_from_settings_uses_prefix_map() {
        let mut settings = Settings::default();
        settings.kidx_model_map.insert("shop_order", "ORD").unwrap();
        let field = KIdxField::from_settings(&settings);
        assert_eq!(field.prefix_for("shop_order"), "ORD");
        assert_eq!(field.prefix_for("shop_refund"), "ID");
    }
}
