//! Timezone support.
//!
//! Provides a process-wide default timezone, per-thread activation on top of
//! it, a timezone-aware `now()`, and local date conversion. This mirrors the
//! parts of Django's `django.utils.timezone` that date-deriving fields rely
//! on: the default comes from `Settings::time_zone` and applies on every
//! thread, including runtime workers, while [`activate_timezone`] overrides
//! it for the calling thread only.
//!
//! ```
//! use kfields_core::timezone;
//!
//! timezone::activate_timezone(5 * 3600); // UTC+5
//! let today = timezone::localdate(&timezone::now());
//! timezone::deactivate_timezone();
//! # let _ = today;
//! ```

use std::cell::RefCell;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::FieldResult;
use crate::settings::Settings;

/// The process-wide default offset in seconds east of UTC.
static DEFAULT_TIMEZONE: RwLock<i32> = RwLock::new(0);

thread_local! {
    /// Per-thread override; `None` means the process default.
    static CURRENT_TIMEZONE: RefCell<Option<i32>> = const { RefCell::new(None) };
}

/// Sets the default timezone used by every thread without an override.
pub fn set_default_timezone(offset_seconds: i32) {
    *DEFAULT_TIMEZONE.write().unwrap_or_else(PoisonError::into_inner) = offset_seconds;
}

/// Returns the process-wide default offset in seconds east of UTC.
pub fn default_timezone_offset() -> i32 {
    *DEFAULT_TIMEZONE.read().unwrap_or_else(PoisonError::into_inner)
}

/// Activates a timezone for the current thread.
///
/// `offset_seconds` is the number of seconds east of UTC; UTC+5:30 is `19800`.
pub fn activate_timezone(offset_seconds: i32) {
    CURRENT_TIMEZONE.with(|cell| {
        *cell.borrow_mut() = Some(offset_seconds);
    });
}

/// Makes [`Settings::time_zone`] the process-wide default timezone.
///
/// Call once at startup. Threads that later call [`activate_timezone`] keep
/// their override.
pub fn activate_from_settings(settings: &Settings) -> FieldResult<()> {
    let offset = settings.time_zone_offset()?;
    set_default_timezone(offset);
    tracing::debug!(time_zone = %settings.time_zone, offset, "default timezone set");
    Ok(())
}

/// Removes the current thread's override, reverting to the default timezone.
pub fn deactivate_timezone() {
    CURRENT_TIMEZONE.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Returns the offset in effect on this thread: its override if one is
/// active, otherwise the process default.
pub fn get_current_timezone_offset() -> i32 {
    CURRENT_TIMEZONE
        .with(|cell| *cell.borrow())
        .unwrap_or_else(default_timezone_offset)
}

/// Returns the current timezone as a `FixedOffset`.
pub fn get_current_timezone() -> FixedOffset {
    FixedOffset::east_opt(get_current_timezone_offset()).unwrap_or_else(utc)
}

/// Returns the current date and time in UTC.
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&utc())
}

/// Converts a datetime to the current thread's active timezone.
pub fn localtime(dt: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    dt.with_timezone(&get_current_timezone())
}

/// Returns the calendar date of `dt` in the active timezone.
///
/// ```
/// use chrono::{FixedOffset, NaiveDate, TimeZone};
/// use kfields_core::timezone;
///
/// let dt = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();
/// timezone::activate_timezone(3 * 3600);
/// assert_eq!(timezone::localdate(&dt), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
/// timezone::deactivate_timezone();
/// ```
pub fn localdate(dt: &DateTime<FixedOffset>) -> NaiveDate {
    localtime(dt).date_naive()
}

/// Returns today's date in the active timezone.
pub fn today() -> NaiveDate {
    localdate(&now())
}

/// Returns `true` if the current thread overrides the default timezone.
pub fn is_timezone_active() -> bool {
    CURRENT_TIMEZONE.with(|cell| cell.borrow().is_some())
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!("zero offset is always valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use std::sync::Mutex;

    // Tests that touch the process default run one at a time.
    static DEFAULT_LOCK: Mutex<()> = Mutex::new(());

    fn lock_default() -> std::sync::MutexGuard<'static, ()> {
        DEFAULT_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_inactive_thread_uses_default() {
        let _guard = lock_default();
        deactivate_timezone();
        assert_eq!(get_current_timezone_offset(), default_timezone_offset());
        assert!(!is_timezone_active());
        assert_eq!(now().offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_localtime_with_timezone() {
        let dt = utc().with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        activate_timezone(5 * 3600);
        let local = localtime(&dt);
        deactivate_timezone();
        assert_eq!(local.hour(), 17);
    }

    #[test]
    fn test_localdate_crosses_midnight_backwards() {
        let dt = utc().with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        activate_timezone(-5 * 3600);
        let date = localdate(&dt);
        deactivate_timezone();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_activate_from_settings() {
        let _guard = lock_default();
        let settings = Settings {
            time_zone: "+02:00".into(),
            ..Settings::default()
        };
        activate_from_settings(&settings).unwrap();
        assert_eq!(default_timezone_offset(), 7200);
        assert!(!is_timezone_active());
        set_default_timezone(0);
    }

    #[test]
    fn test_settings_timezone_reaches_other_threads() {
        let _guard = lock_default();
        let settings = Settings {
            time_zone: "+14:00".into(),
            ..Settings::default()
        };
        activate_from_settings(&settings).unwrap();
        let worker = std::thread::spawn(get_current_timezone_offset).join().unwrap();
        let overridden = std::thread::spawn(|| {
            activate_timezone(-3600);
            get_current_timezone_offset()
        })
        .join()
        .unwrap();
        set_default_timezone(0);

        assert_eq!(worker, 50_400);
        assert_eq!(overridden, -3600);
    }
}
