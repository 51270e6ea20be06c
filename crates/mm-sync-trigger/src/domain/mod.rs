//! Domain Layer - Pure trigger logic with no I/O
//!
//! - Wall-clock value object
//! - Protocol messages and the JSON codec
//! - Origin access filter (loopback + CIDR allow-list)
//! - Wait policy (acceptance windows, suspend/spin crossover)
//! - Trigger and datagram dispositions

pub mod access;
pub mod codec;
pub mod errors;
pub mod message;
pub mod outcome;
pub mod schedule;
pub mod time;

pub use access::{AccessFilter, NetworkPrefix, PrefixParseError};
pub use codec::{CodecLimits, EncodeError, MessageCodec, DEFAULT_MAX_MESSAGE_BYTES};
pub use errors::{DispatchError, DispatchPhase, ProtocolError};
pub use message::{IncomingMessage, Pong, RelayPayload, Trigger, TriggerTime, PROTOCOL_VERSION};
pub use outcome::{CommandStatus, Disposition, TriggerResult};
pub use schedule::{
    WaitOutcome, WaitPlan, WaitPolicy, DEFAULT_MAX_FUTURE, DEFAULT_MAX_PAST, DEFAULT_SPIN_THRESHOLD,
};
pub use time::WallTime;
