//! Ping/pong clock check and trigger fan-out.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use mm_sync_trigger::{Clock, MessageCodec, Trigger};

use crate::CliError;

/// Result of one ping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingReport {
    pub target: SocketAddr,
    pub rtt: Duration,
    /// Remote clock minus local clock, in seconds, assuming a symmetric path.
    pub offset_secs: f64,
}

/// Ping `target` and wait up to `wait` for its pong.
///
/// Datagrams from other addresses are ignored.
pub async fn ping<C: Clock + ?Sized>(
    socket: &UdpSocket,
    codec: &MessageCodec,
    clock: &C,
    target: SocketAddr,
    wait: Duration,
) -> Result<PingReport, CliError> {
    let request = codec.encode_ping();
    let started = Instant::now();
    let sent_wall = clock.wall_now();
    socket.send_to(&request, target).await?;

    let mut buf = [0u8; 512];
    let deadline = started + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let (len, from) = timeout(remaining, socket.recv_from(&mut buf))
            .await
            .map_err(|_| CliError::Timeout(target))??;
        if from != target {
            debug!(%from, "ignoring datagram from unexpected peer");
            continue;
        }

        let rtt = started.elapsed();
        let received_wall = clock.wall_now();
        let pong = codec.decode_pong(&buf[..len])?;

        let midpoint = sent_wall.offset_secs(received_wall.seconds_since(sent_wall) / 2.0);
        return Ok(PingReport {
            target,
            rtt,
            offset_secs: pong.time.seconds_since(midpoint),
        });
    }
}

/// Send `trigger` once to every target. Returns the encoded size.
pub async fn send_trigger(
    socket: &UdpSocket,
    codec: &MessageCodec,
    trigger: &Trigger,
    targets: &[SocketAddr],
) -> Result<usize, CliError> {
    let datagram = codec.encode_trigger(trigger)?;
    for target in targets {
        socket.send_to(&datagram, target).await?;
        debug!(%target, bytes = datagram.len(), "trigger sent");
    }
    Ok(datagram.len())
}
