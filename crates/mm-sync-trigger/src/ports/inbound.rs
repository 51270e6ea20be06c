//! # Driving Ports (Inbound API)
//!
//! What the transport layer calls into.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::domain::Disposition;

/// Handles one datagram end to end.
///
/// Implementations keep no state across calls; everything derived from a
/// datagram is dropped when the call returns.
#[async_trait]
pub trait DatagramHandler: Send + Sync {
    /// Filter, decode and act on `data` received from `sender`.
    ///
    /// A returned [`Disposition::Reply`] must be sent back to `sender`.
    async fn handle_datagram(&self, data: &[u8], sender: SocketAddr) -> Disposition;
}
