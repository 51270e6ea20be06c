//! Wall-clock value object.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A wall-clock instant expressed as seconds since the Unix epoch.
///
/// The wire protocol carries instants as floating point epoch seconds, so the
/// domain keeps the same representation to avoid lossy round trips.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct WallTime(f64);

impl WallTime {
    /// Create from epoch seconds.
    #[must_use]
    pub const fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    /// Epoch seconds.
    #[must_use]
    pub const fn as_secs_f64(self) -> f64 {
        self.0
    }

    /// Convert a `SystemTime`. Instants before the epoch map to negative seconds.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self(since.as_secs_f64()),
            Err(before) => Self(-before.duration().as_secs_f64()),
        }
    }

    /// Signed distance `self - earlier` in seconds.
    #[must_use]
    pub fn seconds_since(self, earlier: WallTime) -> f64 {
        self.0 - earlier.0
    }

    /// Shift forward by a duration.
    #[must_use]
    pub fn add_duration(self, duration: Duration) -> Self {
        Self(self.0 + duration.as_secs_f64())
    }

    /// Shift by a signed number of seconds.
    #[must_use]
    pub fn offset_secs(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    /// Whether the instant is a usable finite number.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
