//! Domain errors for the trigger service.
//!
//! Every variant here is recoverable: the offending datagram or trigger is
//! dropped and the listener moves on to the next datagram.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Reasons an inbound datagram is rejected before it reaches dispatch.
///
/// Protocol errors are never answered on the wire. The protocol has no
/// negative acknowledgement, so a rejected sender learns nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Datagram exceeds the configured byte ceiling.
    #[error("datagram of {size} bytes exceeds the {max} byte ceiling")]
    Oversized { size: usize, max: usize },

    /// Not UTF-8 or not a JSON object.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Version field absent or not the supported version.
    #[error("unsupported protocol version {}", .found.as_deref().unwrap_or("<missing>"))]
    UnsupportedVersion { found: Option<String> },

    /// Message type absent or not one of the known kinds.
    #[error("unknown message type {}", .found.as_deref().unwrap_or("<missing>"))]
    UnknownKind { found: Option<String> },

    /// Trigger without a relay payload.
    #[error("trigger missing 'rpc' payload")]
    MissingPayload,

    /// Trigger carrying neither or both of the temporal fields.
    #[error("trigger must carry exactly one of 't' or 'delay'")]
    MissingOrAmbiguousTime,

    /// Temporal field present but not a finite number.
    #[error("trigger field '{field}' is not a finite number")]
    InvalidTime { field: &'static str },

    /// Relative delay negative or beyond the future window.
    #[error("trigger delay {delay:.3}s outside [0, {max:.3}]s")]
    DelayOutOfRange { delay: f64, max: f64 },
}

/// Stage of an outbound command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// Request build, TCP connect and handshake (before the wait).
    Connect,
    /// Writing the pre-serialized request (after the wait).
    Send,
    /// Reading the response head.
    Response,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Send => write!(f, "send"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// Failures talking to the local command endpoint.
///
/// All of them are soft: the trigger is abandoned, never retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to connect to command endpoint {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("command endpoint {phase} timed out after {timeout:?}")]
    Timeout {
        phase: DispatchPhase,
        timeout: Duration,
    },

    #[error("failed to send command: {0}")]
    Send(#[source] io::Error),

    #[error("failed to read command response: {0}")]
    Response(#[source] io::Error),

    #[error("malformed response head: {0}")]
    BadStatusLine(String),

    /// Request could not be built, e.g. the configured path is not a valid URI.
    #[error("cannot build command request: {0}")]
    InvalidRequest(String),
}

impl DispatchError {
    /// The exchange stage that failed.
    #[must_use]
    pub fn phase(&self) -> DispatchPhase {
        match self {
            Self::Connect { .. } | Self::InvalidRequest(_) => DispatchPhase::Connect,
            Self::Timeout { phase, .. } => *phase,
            Self::Send(_) => DispatchPhase::Send,
            Self::Response(_) | Self::BadStatusLine(_) => DispatchPhase::Response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        assert_eq!(
            ProtocolError::UnsupportedVersion { found: None }.to_string(),
            "unsupported protocol version <missing>"
        );
        assert_eq!(
            ProtocolError::UnsupportedVersion {
                found: Some("2".into())
            }
            .to_string(),
            "unsupported protocol version 2"
        );
        assert_eq!(
            ProtocolError::DelayOutOfRange {
                delay: 12.0,
                max: 10.0
            }
            .to_string(),
            "trigger delay 12.000s outside [0, 10.000]s"
        );
    }

    #[test]
    fn test_dispatch_error_phase() {
        let err = DispatchError::Timeout {
            phase: DispatchPhase::Send,
            timeout: Duration::from_secs(3),
        };
        assert_eq!(err.phase(), DispatchPhase::Send);
        assert_eq!(
            DispatchError::BadStatusLine(String::new()).phase(),
            DispatchPhase::Response
        );
    }
}
