use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::dispatcher::CommandDispatcher;
use crate::domain::{AccessFilter, Disposition, IncomingMessage, MessageCodec, Pong, WaitPolicy};
use crate::ports::{Clock, CommandEndpoint, DatagramHandler};

/// Trigger service implementing the driving port.
///
/// Wires the origin filter, the codec and the dispatcher together. Holds no
/// per-message state: everything derived from a datagram lives on the stack
/// of [`DatagramHandler::handle_datagram`].
///
/// # Example
///
/// ```rust,ignore
/// let clock = Arc::new(SystemClock::new());
/// let endpoint = HttpCommandEndpoint::new(addr, "/jsonrpc", Duration::from_secs(3));
/// let service = TriggerService::new(
///     AccessFilter::loopback_only(),
///     MessageCodec::default(),
///     WaitPolicy::default(),
///     clock,
///     endpoint,
/// );
/// let disposition = service.handle_datagram(bytes, sender).await;
/// ```
pub struct TriggerService<C: Clock, E: CommandEndpoint> {
    filter: AccessFilter,
    codec: MessageCodec,
    clock: Arc<C>,
    dispatcher: CommandDispatcher<C, E>,
}

impl<C: Clock, E: CommandEndpoint> TriggerService<C, E> {
    /// Create a new trigger service.
    ///
    /// # Arguments
    ///
    /// * `filter` - Origin allow-list
    /// * `codec` - Decoder with size and delay limits
    /// * `policy` - Scheduler acceptance windows
    /// * `clock` - Wall and monotonic time source
    /// * `endpoint` - Local command endpoint
    pub fn new(
        filter: AccessFilter,
        codec: MessageCodec,
        policy: WaitPolicy,
        clock: Arc<C>,
        endpoint: E,
    ) -> Self {
        Self {
            filter,
            codec,
            dispatcher: CommandDispatcher::new(Arc::clone(&clock), endpoint, policy),
            clock,
        }
    }

    pub fn filter(&self) -> &AccessFilter {
        &self.filter
    }

    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<C, E> {
        &self.dispatcher
    }
}

#[async_trait]
impl<C, E> DatagramHandler for TriggerService<C, E>
where
    C: Clock,
    E: CommandEndpoint,
{
    async fn handle_datagram(&self, data: &[u8], sender: SocketAddr) -> Disposition {
        let received_at = self.clock.wall_now();

        if !self.filter.permits(sender.ip()) {
            warn!(%sender, "datagram from unauthorized origin dropped");
            return Disposition::Unauthorized;
        }

        let message = match self.codec.decode(data) {
            Ok(message) => message,
            Err(e) => {
                warn!(%sender, bytes = data.len(), error = %e, "datagram rejected");
                return Disposition::Rejected(e);
            }
        };
        debug!(%sender, kind = message.kind(), "datagram accepted");

        match message {
            IncomingMessage::Ping => {
                let pong = Pong::new(self.clock.wall_now());
                debug!(%sender, time = %pong.time, "answering ping");
                Disposition::Reply(self.codec.encode_pong(&pong))
            }
            IncomingMessage::Trigger(trigger) => {
                Disposition::Trigger(self.dispatcher.dispatch(&trigger, received_at).await)
            }
        }
    }
}
