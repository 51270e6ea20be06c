//! Protocol message types.

use bytes::Bytes;

use super::time::WallTime;

/// The single protocol version this service speaks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Opaque command forwarded verbatim to the local command endpoint.
///
/// The bytes are the exact JSON text of the `rpc` field as it appeared in the
/// datagram. Nothing in this crate parses or rewrites them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPayload(Bytes);

impl RelayPayload {
    /// Wrap raw payload bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Shared handle to the payload bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// When a trigger should fire. Exactly one form is carried per trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerTime {
    /// Seconds after receipt, measured on the receiver's clock.
    Relative(f64),
    /// Absolute wall-clock instant; requires the sender to be time-synced too.
    Absolute(WallTime),
}

/// A validated trigger request.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub time: TriggerTime,
    pub payload: RelayPayload,
}

/// A decoded and validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    Trigger(Trigger),
    Ping,
}

impl IncomingMessage {
    /// Wire name of the message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Trigger(_) => "trigger",
            Self::Ping => "ping",
        }
    }
}

/// Reply to a ping carrying the responder's wall clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pong {
    pub version: u32,
    pub time: WallTime,
}

impl Pong {
    /// Pong for the supported protocol version.
    #[must_use]
    pub fn new(time: WallTime) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            time,
        }
    }
}
