//! Running counters over handled datagrams.

use std::fmt;

use crate::domain::{Disposition, TriggerResult};

/// Totals since the listener started. Logged once at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub received: u64,
    pub unauthorized: u64,
    pub rejected: u64,
    pub pings: u64,
    pub triggers_fired: u64,
    pub triggers_dropped: u64,
    pub dispatch_failures: u64,
}

impl ServiceStats {
    /// Account for one handled datagram.
    pub fn record(&mut self, disposition: &Disposition) {
        self.received += 1;
        match disposition {
            Disposition::Unauthorized => self.unauthorized += 1,
            Disposition::Rejected(_) => self.rejected += 1,
            Disposition::Reply(_) => self.pings += 1,
            Disposition::Trigger(TriggerResult::Dropped(_)) => self.triggers_dropped += 1,
            Disposition::Trigger(TriggerResult::PrepareFailed(_)) => self.dispatch_failures += 1,
            Disposition::Trigger(result @ TriggerResult::Fired { .. }) => {
                self.triggers_fired += 1;
                if !result.is_success() {
                    self.dispatch_failures += 1;
                }
            }
        }
    }
}

impl fmt::Display for ServiceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} unauthorized={} rejected={} pings={} fired={} dropped={} failures={}",
            self.received,
            self.unauthorized,
            self.rejected,
            self.pings,
            self.triggers_fired,
            self.triggers_dropped,
            self.dispatch_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandStatus, ProtocolError, WaitOutcome};

    #[test]
    fn test_record_counts_each_disposition() {
        let mut stats = ServiceStats::default();
        stats.record(&Disposition::Unauthorized);
        stats.record(&Disposition::Rejected(ProtocolError::MissingPayload));
        stats.record(&Disposition::Reply(Vec::new()));
        stats.record(&Disposition::Trigger(TriggerResult::Dropped(
            WaitOutcome::RejectedFuture,
        )));
        stats.record(&Disposition::Trigger(TriggerResult::Fired {
            accuracy_ms: 0.2,
            delivery: Ok(CommandStatus(200)),
        }));
        stats.record(&Disposition::Trigger(TriggerResult::Fired {
            accuracy_ms: 0.2,
            delivery: Ok(CommandStatus(503)),
        }));

        assert_eq!(
            stats,
            ServiceStats {
                received: 6,
                unauthorized: 1,
                rejected: 1,
                pings: 1,
                triggers_fired: 2,
                triggers_dropped: 1,
                dispatch_failures: 1,
            }
        );
        assert!(stats.to_string().starts_with("received=6"));
    }
}
