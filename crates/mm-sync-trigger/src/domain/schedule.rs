//! Wait policy: classification of a target instant relative to "now".
//!
//! The policy is pure; the timed wait that executes a [`WaitPlan::Wait`]
//! lives in `service::scheduler`.

use std::time::Duration;

/// Default tolerance for targets already in the past.
pub const DEFAULT_MAX_PAST: Duration = Duration::from_secs(5);
/// Default horizon for targets in the future.
pub const DEFAULT_MAX_FUTURE: Duration = Duration::from_secs(10);
/// Default remaining time below which the wait busy-polls.
pub const DEFAULT_SPIN_THRESHOLD: Duration = Duration::from_millis(5);

/// Terminal result of a scheduled wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The target instant has been reached; fire now.
    Fired,
    /// Target is older than the past tolerance.
    DiscardedStale,
    /// Target is beyond the future horizon.
    RejectedFuture,
}

impl WaitOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fired => "fired",
            Self::DiscardedStale => "discarded_stale",
            Self::RejectedFuture => "rejected_future",
        }
    }
}

/// What to do about a target `delta` seconds away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitPlan {
    DiscardStale,
    FireNow,
    Wait(Duration),
    RejectFuture,
}

/// Acceptance windows and the suspend/spin crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_past: Duration,
    pub max_future: Duration,
    pub spin_threshold: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_past: DEFAULT_MAX_PAST,
            max_future: DEFAULT_MAX_FUTURE,
            spin_threshold: DEFAULT_SPIN_THRESHOLD,
        }
    }
}

impl WaitPolicy {
    /// Classify a signed distance `target - now` in seconds.
    ///
    /// Boundaries: exactly `-max_past` still fires, exactly `0` fires without
    /// waiting, exactly `max_future` waits.
    #[must_use]
    pub fn plan(&self, delta_secs: f64) -> WaitPlan {
        if delta_secs.is_nan() || delta_secs < -self.max_past.as_secs_f64() {
            WaitPlan::DiscardStale
        } else if delta_secs <= 0.0 {
            WaitPlan::FireNow
        } else if delta_secs > self.max_future.as_secs_f64() {
            WaitPlan::RejectFuture
        } else {
            WaitPlan::Wait(Duration::from_secs_f64(delta_secs))
        }
    }

    /// Portion of `remaining` to spend suspended before spinning.
    #[must_use]
    pub fn coarse_portion(&self, remaining: Duration) -> Option<Duration> {
        remaining
            .checked_sub(self.spin_threshold)
            .filter(|coarse| !coarse.is_zero())
    }
}
