//! # Driven Ports (Outbound SPI)
//!
//! Interfaces this subsystem requires from its host: clocks and the local
//! command endpoint.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{CommandStatus, DispatchError, RelayPayload, WallTime};

/// Abstract interface for time.
///
/// Two clock domains are exposed separately. Wall time is what triggers are
/// expressed in and may be stepped by the time-sync daemon at any moment.
/// Monotonic time never jumps and is what waits are measured on.
///
/// Enables deterministic testing by injecting a controllable clock.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock instant.
    fn wall_now(&self) -> WallTime;

    /// Elapsed time since a fixed, arbitrary origin. Never decreases.
    fn monotonic_now(&self) -> Duration;

    /// Yield the processor for roughly `duration`.
    ///
    /// Granularity is coarse; callers needing precision spin on
    /// [`Clock::monotonic_now`] afterwards.
    async fn suspend(&self, duration: Duration);
}

/// Abstract interface for the local media command endpoint.
///
/// Delivery is split in two so that connection setup and serialization can
/// happen before the timing-critical wait and only the write happens after.
#[async_trait]
pub trait CommandEndpoint: Send + Sync {
    /// A connected, ready-to-send command.
    type Prepared: PreparedCommand;

    /// Connect and serialize the full request for `payload`.
    ///
    /// # Errors
    ///
    /// Connection failure or timeout. The trigger must then be abandoned
    /// without waiting.
    async fn prepare(&self, payload: &RelayPayload) -> Result<Self::Prepared, DispatchError>;
}

/// A command whose connection is open and whose bytes are already built.
///
/// Dropping it without sending closes the connection.
#[async_trait]
pub trait PreparedCommand: Send {
    /// Write the pre-serialized request.
    async fn send(&mut self) -> Result<(), DispatchError>;

    /// Read the endpoint's status after [`PreparedCommand::send`].
    async fn response(&mut self) -> Result<CommandStatus, DispatchError>;
}
