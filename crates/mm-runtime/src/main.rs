//! # Media-Mux Trigger Node
//!
//! Runs on every playback device. Receives trigger datagrams on UDP 9199,
//! waits until the named wall-clock instant and fires the embedded command at
//! the local media player.
//!
//! Single-threaded: one datagram is handled end to end before the next is
//! read.

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use mm_runtime::{init_telemetry, load_config, spawn_signal_listener, TelemetryConfig, TriggerNode};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting trigger node");

    let config = load_config().context("failed to load configuration")?;

    let node = TriggerNode::bind(&config)
        .await
        .context("failed to start trigger listener")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx);

    let stats = node.run(shutdown_rx).await.context("trigger listener failed")?;

    info!(%stats, "trigger node stopped");
    Ok(())
}
