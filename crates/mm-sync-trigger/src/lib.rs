//! # Media-Mux Synchronized Trigger
//!
//! Lets independent playback devices execute the same command at the same
//! wall-clock instant. Devices keep their clocks in agreement through an
//! external time-sync daemon; this crate receives small JSON datagrams
//! naming a moment and an opaque command, waits for that moment with
//! sub-millisecond precision and hands the command to the local media
//! player's HTTP endpoint.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Wire codec, origin filter, wait policy (no I/O)
//! - **Ports Layer:** `DatagramHandler`, `Clock`, `CommandEndpoint`
//! - **Service Layer:** Per-datagram pipeline, scheduler, dispatcher
//! - **Adapters Layer:** System clock, HTTP endpoint, UDP listener, config
//!
//! ## Timing
//!
//! A trigger's target instant is converted once into a deadline on the
//! monotonic clock. The task suspends until shortly before the deadline and
//! busy-polls the rest. The connection to the endpoint is opened and the
//! request serialized before the wait; after it only the write remains.
//!
//! ## Example
//!
//! ```rust
//! use mm_sync_trigger::{IncomingMessage, MessageCodec, TriggerTime};
//!
//! let codec = MessageCodec::default();
//! let message = codec
//!     .decode(br#"{"v":1,"type":"trigger","delay":0.5,"rpc":{"method":"Player.PlayPause"}}"#)
//!     .unwrap();
//!
//! match message {
//!     IncomingMessage::Trigger(trigger) => {
//!         assert_eq!(trigger.time, TriggerTime::Relative(0.5));
//!         assert_eq!(trigger.payload.as_bytes(), br#"{"method":"Player.PlayPause"}"#);
//!     }
//!     IncomingMessage::Ping => unreachable!(),
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test doubles (FakeClock, RecordingEndpoint).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Domain
pub use domain::{
    AccessFilter, CodecLimits, CommandStatus, DispatchError, DispatchPhase, Disposition,
    EncodeError, IncomingMessage, MessageCodec, NetworkPrefix, Pong, PrefixParseError,
    ProtocolError, RelayPayload, Trigger, TriggerResult, TriggerTime, WaitOutcome, WaitPlan,
    WaitPolicy, WallTime, PROTOCOL_VERSION,
};

// Ports
pub use ports::{Clock, CommandEndpoint, DatagramHandler, PreparedCommand};

// Service
pub use service::{wait_until, CommandDispatcher, ServiceStats, TriggerService};

// Adapters
pub use adapters::{
    ConfigError, HttpCommandEndpoint, ListenerError, SystemClock, TriggerConfig, UdpListener,
};
