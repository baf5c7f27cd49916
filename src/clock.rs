//! Wall-clock abstraction
//!
//! Token expiry and device-code deadlines are absolute timestamps, so every
//! engine reads the time through a [`Clock`]. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`].

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};

use crate::error::{OAuthError, Result};

/// Source of the current UTC time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current time.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Clock`] if the time cannot be obtained.
    fn now(&self) -> Result<DateTime<Utc>>;
}

/// Clock backed by the operating system's real-time clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| OAuthError::Clock(format!("system time is before the Unix epoch: {e}")))?;
        let secs = i64::try_from(since_epoch.as_secs())
            .map_err(|_| OAuthError::Clock("system time out of range".to_string()))?;
        DateTime::from_timestamp(secs, since_epoch.subsec_nanos())
            .ok_or_else(|| OAuthError::Clock("system time out of range".to_string()))
    }
}

/// Manually advanced clock for deterministic tests.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use grantflow::clock::{Clock, ManualClock};
///
/// let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::seconds(30));
/// assert_eq!(clock.now().unwrap(), start + Duration::seconds(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }

    /// Sets the clock to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<DateTime<Utc>> {
        Ok(*self.now.lock().unwrap_or_else(|p| p.into_inner()))
    }
}
