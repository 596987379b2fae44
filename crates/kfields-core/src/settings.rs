//! Settings for the kfields crates.
//!
//! [`Settings`] holds the handful of options the fields need: the table name
//! to identifier prefix map used by `KIdxField`, the local time zone used for
//! date derivation, and logging options. Settings are plain values passed to
//! whoever needs them; there is no global instance.

use std::collections::BTreeMap;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// The prefix used when a table has no entry in the [`KIdxPrefixMap`].
pub const DEFAULT_KIDX_PREFIX: &str = "ID";

/// Maps database table names to short identifier prefixes.
///
/// Prefixes are 2 to 4 ASCII letters. Lookups for unknown tables fall back to
/// [`DEFAULT_KIDX_PREFIX`].
///
/// # Examples
///
/// ```
/// use kfields_core::settings::KIdxPrefixMap;
///
/// let map = KIdxPrefixMap::from_pairs([("shop_order", "ORD")]).unwrap();
/// assert_eq!(map.prefix_for("shop_order"), "ORD");
/// assert_eq!(map.prefix_for("shop_customer"), "ID");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KIdxPrefixMap {
    entries: BTreeMap<String, String>,
}

impl KIdxPrefixMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(table, prefix)` pairs, validating every prefix.
    pub fn from_pairs<I, K, V>(pairs: I) -> FieldResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (table, prefix) in pairs {
            map.insert(table, prefix)?;
        }
        Ok(map)
    }

    /// Registers a prefix for a table.
    pub fn insert(
        &mut self,
        table: impl Into<String>,
        prefix: impl Into<String>,
    ) -> FieldResult<()> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        self.entries.insert(table.into(), prefix);
        Ok(())
    }

    /// Returns the prefix for a table, or [`DEFAULT_KIDX_PREFIX`].
    pub fn prefix_for(&self, table: &str) -> &str {
        self.entries
            .get(table)
            .map_or(DEFAULT_KIDX_PREFIX, String::as_str)
    }

    /// Checks every entry; used after deserializing a map from a file.
    pub fn validate(&self) -> FieldResult<()> {
        self.entries.values().try_for_each(|p| validate_prefix(p))
    }

    /// The length of the longest prefix this map can produce.
    pub fn longest_prefix_len(&self) -> usize {
        self.entries
            .values()
            .map(String::len)
            .chain(std::iter::once(DEFAULT_KIDX_PREFIX.len()))
            .max()
            .unwrap_or(DEFAULT_KIDX_PREFIX.len())
    }

    /// Returns the number of configured tables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no table has a prefix configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_prefix(prefix: &str) -> FieldResult<()> {
    if (2..=4).contains(&prefix.len()) && prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(FieldError::ConfigurationError(format!(
            "KIdx prefix '{prefix}' must be 2 to 4 ASCII letters"
        )))
    }
}

/// The complete set of kfields settings.
///
/// # Examples
///
/// ```
/// use kfields_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.time_zone, "UTC");
/// assert!(settings.kidx_model_map.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log level filter (e.g. "info", "kfields_db=debug").
    pub log_level: String,
    /// The local time zone as "UTC" or a fixed offset such as "+05:30".
    pub time_zone: String,
    /// Table name to identifier prefix map for `KIdxField`.
    pub kidx_model_map: KIdxPrefixMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            time_zone: "UTC".to_string(),
            kidx_model_map: KIdxPrefixMap::new(),
        }
    }
}

impl Settings {
    /// Parses [`time_zone`](Self::time_zone) into seconds east of UTC.
    ///
    /// Accepts `UTC`, `Z`, and `+HH:MM` / `-HH:MM` / `+HHMM` offsets.
    pub fn time_zone_offset(&self) -> FieldResult<i32> {
        parse_offset(&self.time_zone).ok_or_else(|| {
            FieldError::ConfigurationError(format!(
                "Unsupported time zone '{}': use UTC or a fixed offset like +05:30",
                self.time_zone
            ))
        })
    }
}

fn parse_offset(tz: &str) -> Option<i32> {
    let tz = tz.trim();
    if tz.eq_ignore_ascii_case("utc") || tz == "Z" {
        return Some(0);
    }
    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let seconds = sign * (hours * 3600 + minutes * 60);
    FixedOffset::east_opt(seconds).map(|_| seconds)
}
