use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;

use crate::domain::WallTime;
use crate::ports::Clock;

// ============================================================================
// SystemClock - Production Clock
// ============================================================================

/// Production clock: `SystemTime` for wall time, `Instant` for monotonic time
/// and tokio's timer for suspension.
///
/// For testing, use `FakeClock` from the test utilities.
///
/// # Example
///
/// ```rust
/// use mm_sync_trigger::adapters::SystemClock;
/// use mm_sync_trigger::Clock;
///
/// let clock = SystemClock::new();
/// assert!(clock.wall_now().as_secs_f64() > 0.0);
/// let a = clock.monotonic_now();
/// assert!(clock.monotonic_now() >= a);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose monotonic origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn wall_now(&self) -> WallTime {
        WallTime::from_system_time(SystemTime::now())
    }

    fn monotonic_now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn suspend(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
