//! Two-phase wait until a wall-clock instant.
//!
//! The target is converted to a monotonic deadline once, at entry. From then
//! on only the monotonic clock is consulted, so a wall-clock step during the
//! wait does not move the firing instant.

use std::time::Duration;

use tracing::trace;

use crate::domain::{WaitOutcome, WaitPlan, WaitPolicy, WallTime};
use crate::ports::Clock;

/// Wait until `target` and report whether the caller should fire.
///
/// Targets more than `policy.max_past` ago are discarded, targets more than
/// `policy.max_future` ahead are rejected; neither waits at all. Otherwise the
/// task suspends for all but the last `spin_threshold` and then busy-polls the
/// monotonic clock until the deadline.
pub async fn wait_until<C: Clock + ?Sized>(
    clock: &C,
    target: WallTime,
    policy: &WaitPolicy,
) -> WaitOutcome {
    let delta = target.seconds_since(clock.wall_now());

    let remaining = match policy.plan(delta) {
        WaitPlan::DiscardStale => return WaitOutcome::DiscardedStale,
        WaitPlan::RejectFuture => return WaitOutcome::RejectedFuture,
        WaitPlan::FireNow => return WaitOutcome::Fired,
        WaitPlan::Wait(remaining) => remaining,
    };

    let deadline = clock.monotonic_now() + remaining;

    if let Some(coarse) = policy.coarse_portion(remaining) {
        trace!(coarse_ms = coarse.as_secs_f64() * 1000.0, "suspending");
        clock.suspend(coarse).await;
    }

    spin_until(clock, deadline);
    WaitOutcome::Fired
}

/// Busy-poll until the monotonic clock reaches `deadline`.
///
/// Returns immediately if the suspension already overshot.
fn spin_until<C: Clock + ?Sized>(clock: &C, deadline: Duration) {
    while clock.monotonic_now() < deadline {
        std::hint::spin_loop();
    }
}
