//! UDP listener driving a [`DatagramHandler`].
//!
//! Datagrams are handled strictly one at a time: the next `recv_from` only
//! happens after the previous trigger has fired or been dropped. The shutdown
//! signal is checked once per loop iteration, and a bounded receive timeout
//! guarantees an iteration at least every `recv_timeout`.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::Disposition;
use crate::ports::DatagramHandler;
use crate::service::ServiceStats;

/// Transport failures of the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The only fatal error: startup cannot continue without the socket.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("UDP receive failed: {0}")]
    Receive(#[source] io::Error),
}

/// Bound UDP socket plus its receive settings.
#[derive(Debug)]
pub struct UdpListener {
    socket: UdpSocket,
    max_message_bytes: usize,
    recv_timeout: Duration,
}

impl UdpListener {
    /// Bind to `addr` with `SO_REUSEADDR` set, so a restarted node can take
    /// the port back immediately.
    ///
    /// # Errors
    ///
    /// [`ListenerError::Bind`] if the address is in use or not permitted.
    pub async fn bind(
        addr: SocketAddr,
        max_message_bytes: usize,
        recv_timeout: Duration,
    ) -> Result<Self, ListenerError> {
        let socket = bind_reusable(addr).map_err(|source| ListenerError::Bind { addr, source })?;
        Ok(Self {
            socket,
            max_message_bytes,
            recv_timeout,
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve until `shutdown` turns true or its sender is dropped.
    ///
    /// # Errors
    ///
    /// [`ListenerError::Receive`] on a socket error other than the transient
    /// ICMP-induced ones, which are logged and skipped.
    pub async fn run<H: DatagramHandler + ?Sized>(
        &self,
        handler: &H,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ServiceStats, ListenerError> {
        let mut stats = ServiceStats::default();
        // One extra byte so an oversized datagram is seen as oversized
        // instead of being silently truncated to the limit.
        let mut buf = vec![0u8; self.max_message_bytes + 1];

        info!(addr = ?self.local_addr().ok(), "listening for trigger messages");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let (len, sender) = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                    continue;
                }
                received = timeout(self.recv_timeout, self.socket.recv_from(&mut buf)) => {
                    match received {
                        Err(_elapsed) => continue,
                        Ok(Ok(received)) => received,
                        Ok(Err(e)) if is_transient(&e) => {
                            debug!(error = %e, "transient receive error");
                            continue;
                        }
                        Ok(Err(e)) => return Err(ListenerError::Receive(e)),
                    }
                }
            };

            let disposition = handler.handle_datagram(&buf[..len], sender).await;

            if let Disposition::Reply(reply) = &disposition {
                if let Err(e) = self.socket.send_to(reply, sender).await {
                    warn!(%sender, error = %e, "failed to send reply");
                }
            }
            stats.record(&disposition);
        }

        info!(%stats, "listener stopped");
        Ok(stats)
    }
}

fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}

/// Errors a UDP socket reports for an earlier send's ICMP response.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
