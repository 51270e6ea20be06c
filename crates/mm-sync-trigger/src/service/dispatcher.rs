//! Command dispatcher: pre-connect, wait, fire.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::scheduler::wait_until;
use crate::domain::{Trigger, TriggerResult, TriggerTime, WaitOutcome, WaitPolicy, WallTime};
use crate::ports::{Clock, CommandEndpoint, PreparedCommand};

/// Delivers a trigger's payload to the command endpoint at its target instant.
///
/// Connection setup and request serialization happen before the wait; only
/// the write of the prepared bytes happens after it. A failed connection
/// abandons the trigger without waiting.
pub struct CommandDispatcher<C: Clock, E: CommandEndpoint> {
    clock: Arc<C>,
    endpoint: E,
    policy: WaitPolicy,
}

impl<C: Clock, E: CommandEndpoint> CommandDispatcher<C, E> {
    pub fn new(clock: Arc<C>, endpoint: E, policy: WaitPolicy) -> Self {
        Self {
            clock,
            endpoint,
            policy,
        }
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Target instant of `trigger` received at `received_at`.
    #[must_use]
    pub fn resolve_target(trigger: &Trigger, received_at: WallTime) -> WallTime {
        match trigger.time {
            TriggerTime::Relative(delay) => received_at.offset_secs(delay),
            TriggerTime::Absolute(at) => at,
        }
    }

    /// Run one trigger to completion.
    ///
    /// Never fails: every error is logged and folded into the returned
    /// [`TriggerResult`].
    pub async fn dispatch(&self, trigger: &Trigger, received_at: WallTime) -> TriggerResult {
        let target = Self::resolve_target(trigger, received_at);
        let lead_ms = target.seconds_since(self.clock.wall_now()) * 1000.0;
        info!(
            target = %target,
            lead_ms,
            payload_bytes = trigger.payload.len(),
            "trigger scheduled"
        );

        let mut prepared = match self.endpoint.prepare(&trigger.payload).await {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "pre-connect failed, trigger abandoned");
                return TriggerResult::PrepareFailed(e);
            }
        };

        let outcome = wait_until(self.clock.as_ref(), target, &self.policy).await;
        if outcome != WaitOutcome::Fired {
            warn!(target = %target, outcome = outcome.as_str(), "trigger dropped");
            // Closes the pre-established connection unused.
            drop(prepared);
            return TriggerResult::Dropped(outcome);
        }

        let sent = prepared.send().await;
        let accuracy_ms = self.clock.wall_now().seconds_since(target) * 1000.0;

        let delivery = match sent {
            Ok(()) => prepared.response().await,
            Err(e) => Err(e),
        };

        match &delivery {
            Ok(status) if status.is_success() => {
                info!(accuracy_ms, status = status.0, "trigger fired");
            }
            Ok(status) => {
                warn!(accuracy_ms, status = status.0, "command endpoint refused trigger");
            }
            Err(e) => {
                warn!(accuracy_ms, phase = %e.phase(), error = %e, "trigger delivery failed");
            }
        }
        debug!(target = %target, "trigger complete");

        TriggerResult::Fired {
            accuracy_ms,
            delivery,
        }
    }
}
