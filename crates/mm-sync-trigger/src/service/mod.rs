//! # Trigger Service
//!
//! High-level service implementing the `DatagramHandler` port.
//!
//! - `core`: per-datagram pipeline (origin filter, decode, ping/trigger)
//! - `dispatcher`: pre-connect, wait, fire
//! - `scheduler`: two-phase wait on the monotonic clock
//! - `stats`: running counters kept by the listener

mod core;
mod dispatcher;
mod scheduler;
mod stats;

pub use self::core::TriggerService;
pub use dispatcher::CommandDispatcher;
pub use scheduler::wait_until;
pub use stats::ServiceStats;

#[cfg(test)]
mod tests;
