//! Trigger node assembly: adapters wired into the service and the listener.

use std::sync::Arc;

use mm_sync_trigger::{
    HttpCommandEndpoint, ListenerError, MessageCodec, ServiceStats, SystemClock, TriggerConfig,
    TriggerService, UdpListener,
};
use tokio::sync::watch;
use tracing::info;

/// A bound, ready-to-serve trigger node.
pub struct TriggerNode {
    listener: UdpListener,
    service: TriggerService<SystemClock, HttpCommandEndpoint>,
}

impl TriggerNode {
    /// Build the service and bind the listening socket.
    ///
    /// # Errors
    ///
    /// [`ListenerError::Bind`], the only fatal startup condition.
    pub async fn bind(config: &TriggerConfig) -> Result<Self, ListenerError> {
        let service = TriggerService::new(
            config.access_filter(),
            MessageCodec::new(config.codec_limits()),
            config.wait_policy(),
            Arc::new(SystemClock::new()),
            HttpCommandEndpoint::new(
                config.endpoint_addr,
                config.endpoint_path.clone(),
                config.io_timeout(),
            ),
        );

        let listener = UdpListener::bind(
            config.listen_addr,
            config.max_message_bytes,
            config.recv_timeout(),
        )
        .await?;

        info!(
            listen = %config.listen_addr,
            endpoint = %config.endpoint_addr,
            allowed = ?config.allowed_prefixes.iter().map(ToString::to_string).collect::<Vec<_>>(),
            max_future_secs = config.max_future_secs,
            max_past_secs = config.max_past_secs,
            spin_threshold_ms = config.spin_threshold_ms,
            "trigger node configured"
        );

        Ok(Self { listener, service })
    }

    pub fn listener(&self) -> &UdpListener {
        &self.listener
    }

    /// Serve until `shutdown` flips.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<ServiceStats, ListenerError> {
        self.listener.run(&self.service, shutdown).await
    }
}
