//! Logging integration for kfields.
//!
//! The field hooks emit [`tracing`] events under the `kfields_db` target.
//! Applications that do not install their own subscriber can call
//! [`setup_logging`] once at startup.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "kfields_db=trace"). In debug mode a pretty, human-readable format is used;
/// otherwise a structured JSON format is used. Installing a subscriber twice
/// is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span covering one model lifecycle operation.
///
/// # Examples
///
/// ```
/// use kfields_core::logging::model_span;
///
/// let span = model_span("save", "shop_order");
/// let _guard = span.enter();
/// tracing::debug!("running pre-save hooks");
/// ```
pub fn model_span(operation: &'static str, table: &str) -> tracing::Span {
    tracing::debug_span!("model", op = operation, table = table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings {
            debug: false,
            log_level: "not a valid filter ===".into(),
            ..Settings::default()
        };
        setup_logging(&settings);
        setup_logging(&Settings::default());
    }
}
