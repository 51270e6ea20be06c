//! Per-datagram and per-trigger results.
//!
//! These are returned to callers for observability and tests; none of them
//! outlive the handling of the datagram that produced them.

use super::errors::{DispatchError, ProtocolError};
use super::schedule::WaitOutcome;

/// Status reported by the command endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus(pub u16);

impl CommandStatus {
    /// 2xx statuses count as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

/// How a single trigger ended.
#[derive(Debug)]
pub enum TriggerResult {
    /// The outbound connection could not be pre-established; no wait happened.
    PrepareFailed(DispatchError),
    /// The scheduler refused the target instant; nothing was sent.
    Dropped(WaitOutcome),
    /// The command was issued at the target instant.
    Fired {
        /// Signed send time minus target time, in milliseconds.
        accuracy_ms: f64,
        /// Endpoint response, or the I/O failure that prevented one.
        delivery: Result<CommandStatus, DispatchError>,
    },
}

impl TriggerResult {
    /// Whether the command reached the endpoint and was accepted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fired { delivery: Ok(status), .. } if status.is_success())
    }
}

/// How a single datagram was handled.
#[derive(Debug)]
pub enum Disposition {
    /// Sender outside loopback and the allow-list. Never decoded.
    Unauthorized,
    /// Decoding or validation failed. Never answered.
    Rejected(ProtocolError),
    /// Send these bytes back to the sender (pong).
    Reply(Vec<u8>),
    /// A trigger was processed to completion.
    Trigger(TriggerResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_status_success_range() {
        assert!(CommandStatus(200).is_success());
        assert!(CommandStatus(204).is_success());
        assert!(!CommandStatus(199).is_success());
        assert!(!CommandStatus(300).is_success());
        assert!(!CommandStatus(500).is_success());
    }

    #[test]
    fn test_trigger_result_success() {
        let ok = TriggerResult::Fired {
            accuracy_ms: 0.1,
            delivery: Ok(CommandStatus(200)),
        };
        assert!(ok.is_success());
        let refused = TriggerResult::Fired {
            accuracy_ms: 0.1,
            delivery: Ok(CommandStatus(401)),
        };
        assert!(!refused.is_success());
        assert!(!TriggerResult::Dropped(WaitOutcome::DiscardedStale).is_success());
    }
}
