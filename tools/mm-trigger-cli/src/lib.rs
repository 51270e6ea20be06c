//! mm-trigger: operator tool for trigger nodes.
//!
//! Sends triggers to several playback devices at once and checks their
//! clocks with ping/pong.

pub mod sender;
pub mod targets;

use thiserror::Error;

use mm_sync_trigger::{EncodeError, ProtocolError};

/// Default trigger node port.
pub const DEFAULT_PORT: u16 = 9199;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot resolve target {target:?}: {reason}")]
    Resolve { target: String, reason: String },

    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no pong from {0} before timeout")]
    Timeout(std::net::SocketAddr),

    #[error("bad reply: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("cannot encode trigger: {0}")]
    Encode(#[from] EncodeError),
}
