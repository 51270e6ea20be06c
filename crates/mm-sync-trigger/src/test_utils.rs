//! Test utilities for the trigger service.
//!
//! Deterministic doubles for the outbound ports. Enable with the `test-utils`
//! feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mm_sync_trigger::test_utils::FakeClock;
//! use mm_sync_trigger::{Clock, WallTime};
//!
//! let clock = FakeClock::new(WallTime::from_secs_f64(1000.0));
//! clock.advance(Duration::from_secs(2));
//! assert_eq!(clock.wall_now().as_secs_f64(), 1002.0);
//! ```

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{CommandStatus, DispatchError, RelayPayload, WallTime};
use crate::ports::{Clock, CommandEndpoint, PreparedCommand};

/// Default monotonic advance per read.
const DEFAULT_TICK: Duration = Duration::from_micros(100);

#[derive(Debug)]
struct FakeClockState {
    wall_origin: f64,
    wall_adjust: f64,
    monotonic: Duration,
    tick: Duration,
    oversleep: Duration,
    step_on_suspend: Option<f64>,
    suspensions: Vec<Duration>,
}

/// A controllable clock.
///
/// - Monotonic and wall time advance together on [`FakeClock::advance`] and
///   on [`Clock::suspend`].
/// - Every [`Clock::monotonic_now`] read advances time by a small tick so
///   that busy-poll loops terminate.
/// - [`FakeClock::step_wall`] moves only the wall clock, like a time-sync
///   step correction.
#[derive(Debug)]
pub struct FakeClock {
    state: Mutex<FakeClockState>,
}

impl FakeClock {
    /// Start at `wall`, monotonic zero.
    pub fn new(wall: WallTime) -> Self {
        Self {
            state: Mutex::new(FakeClockState {
                wall_origin: wall.as_secs_f64(),
                wall_adjust: 0.0,
                monotonic: Duration::ZERO,
                tick: DEFAULT_TICK,
                oversleep: Duration::ZERO,
                step_on_suspend: None,
                suspensions: Vec::new(),
            }),
        }
    }

    /// Set the per-read monotonic advance.
    #[must_use]
    pub fn with_tick(self, tick: Duration) -> Self {
        self.state.lock().tick = tick;
        self
    }

    /// Make every suspension overshoot by `extra`.
    #[must_use]
    pub fn with_oversleep(self, extra: Duration) -> Self {
        self.state.lock().oversleep = extra;
        self
    }

    /// Move both clocks forward.
    pub fn advance(&self, duration: Duration) {
        self.state.lock().monotonic += duration;
    }

    /// Step the wall clock only (positive or negative seconds).
    pub fn step_wall(&self, secs: f64) {
        self.state.lock().wall_adjust += secs;
    }

    /// Apply a wall step the next time [`Clock::suspend`] is called.
    pub fn step_wall_during_next_suspend(&self, secs: f64) {
        self.state.lock().step_on_suspend = Some(secs);
    }

    /// Monotonic reading without advancing the tick.
    pub fn monotonic_peek(&self) -> Duration {
        self.state.lock().monotonic
    }

    /// Every duration passed to [`Clock::suspend`], in order.
    pub fn suspensions(&self) -> Vec<Duration> {
        self.state.lock().suspensions.clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn wall_now(&self) -> WallTime {
        let state = self.state.lock();
        WallTime::from_secs_f64(
            state.wall_origin + state.monotonic.as_secs_f64() + state.wall_adjust,
        )
    }

    fn monotonic_now(&self) -> Duration {
        let state = &mut *self.state.lock();
        let now = state.monotonic;
        state.monotonic += state.tick;
        now
    }

    async fn suspend(&self, duration: Duration) {
        let state = &mut *self.state.lock();
        state.suspensions.push(duration);
        state.monotonic += duration + state.oversleep;
        if let Some(step) = state.step_on_suspend.take() {
            state.wall_adjust += step;
        }
    }
}

/// One observed interaction with a [`RecordingEndpoint`].
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointEvent {
    /// Connection established and request serialized.
    Prepared { at: Duration, payload: RelayPayload },
    /// Request written.
    Sent { at: Duration, payload: RelayPayload },
}

#[derive(Debug, Default)]
struct RecordingState {
    events: Vec<EndpointEvent>,
    fail_prepare: bool,
    fail_send: bool,
    status: Option<u16>,
}

/// Command endpoint double that timestamps each phase on a shared clock.
///
/// Clones share the same event log.
pub struct RecordingEndpoint<C: Clock> {
    clock: Arc<C>,
    state: Arc<Mutex<RecordingState>>,
}

impl<C: Clock> Clone for RecordingEndpoint<C> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: Clock> RecordingEndpoint<C> {
    /// Endpoint answering 200 to everything.
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(RecordingState::default())),
        }
    }

    /// Refuse connections.
    pub fn fail_prepare(&self) {
        self.state.lock().fail_prepare = true;
    }

    /// Accept connections but fail the write.
    pub fn fail_send(&self) {
        self.state.lock().fail_send = true;
    }

    /// Answer with `status` instead of 200.
    pub fn respond_with(&self, status: u16) {
        self.state.lock().status = Some(status);
    }

    pub fn events(&self) -> Vec<EndpointEvent> {
        self.state.lock().events.clone()
    }

    /// Payloads that were actually sent.
    pub fn sent_payloads(&self) -> Vec<RelayPayload> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                EndpointEvent::Sent { payload, .. } => Some(payload.clone()),
                EndpointEvent::Prepared { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl<C: Clock + 'static> CommandEndpoint for RecordingEndpoint<C> {
    type Prepared = RecordedCommand<C>;

    async fn prepare(&self, payload: &RelayPayload) -> Result<Self::Prepared, DispatchError> {
        let at = self.clock.monotonic_now();
        let mut state = self.state.lock();
        if state.fail_prepare {
            return Err(DispatchError::Connect {
                addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8888)),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        state.events.push(EndpointEvent::Prepared {
            at,
            payload: payload.clone(),
        });
        Ok(RecordedCommand {
            endpoint: self.clone(),
            payload: payload.clone(),
            fail_send: state.fail_send,
            status: state.status.unwrap_or(200),
        })
    }
}

/// Prepared command produced by [`RecordingEndpoint`].
pub struct RecordedCommand<C: Clock> {
    endpoint: RecordingEndpoint<C>,
    payload: RelayPayload,
    fail_send: bool,
    status: u16,
}

#[async_trait]
impl<C: Clock + 'static> PreparedCommand for RecordedCommand<C> {
    async fn send(&mut self) -> Result<(), DispatchError> {
        if self.fail_send {
            return Err(DispatchError::Send(io::Error::from(
                io::ErrorKind::BrokenPipe,
            )));
        }
        let at = self.endpoint.clock.monotonic_now();
        self.endpoint.state.lock().events.push(EndpointEvent::Sent {
            at,
            payload: self.payload.clone(),
        });
        Ok(())
    }

    async fn response(&mut self) -> Result<CommandStatus, DispatchError> {
        Ok(CommandStatus(self.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_monotonic_ticks_on_read() {
        let clock = FakeClock::new(WallTime::from_secs_f64(0.0)).with_tick(Duration::from_millis(1));
        assert_eq!(clock.monotonic_now(), Duration::ZERO);
        assert_eq!(clock.monotonic_now(), Duration::from_millis(1));
        assert_eq!(clock.monotonic_peek(), Duration::from_millis(2));
    }

    #[test]
    fn test_fake_clock_wall_step_leaves_monotonic() {
        let clock = FakeClock::new(WallTime::from_secs_f64(100.0));
        clock.step_wall(-3.0);
        assert_eq!(clock.wall_now().as_secs_f64(), 97.0);
        assert_eq!(clock.monotonic_peek(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_fake_clock_suspend_records_and_oversleeps() {
        let clock = FakeClock::new(WallTime::from_secs_f64(0.0))
            .with_oversleep(Duration::from_millis(2));
        clock.suspend(Duration::from_millis(10)).await;
        assert_eq!(clock.suspensions(), vec![Duration::from_millis(10)]);
        assert_eq!(clock.monotonic_peek(), Duration::from_millis(12));
    }

    #[tokio::test]
    async fn test_fake_clock_wall_step_during_suspend() {
        let clock = FakeClock::new(WallTime::from_secs_f64(100.0)).with_tick(Duration::ZERO);
        clock.step_wall_during_next_suspend(2.5);
        clock.suspend(Duration::from_secs(1)).await;
        assert_eq!(clock.monotonic_now(), Duration::from_secs(1));
        assert_eq!(clock.wall_now().as_secs_f64(), 103.5);

        // The step applies once.
        clock.suspend(Duration::from_secs(1)).await;
        assert_eq!(clock.wall_now().as_secs_f64(), 104.5);
    }

    #[tokio::test]
    async fn test_recording_endpoint_fail_prepare() {
        let clock = Arc::new(FakeClock::new(WallTime::from_secs_f64(0.0)));
        let endpoint = RecordingEndpoint::new(clock);
        endpoint.fail_prepare();
        let result = endpoint.prepare(&RelayPayload::new(&b"{}"[..])).await;
        assert!(matches!(result, Err(DispatchError::Connect { .. })));
        assert!(endpoint.events().is_empty());
    }
}
