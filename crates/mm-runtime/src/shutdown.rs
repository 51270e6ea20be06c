//! Termination signals mapped onto a shutdown flag.

use tokio::sync::watch;
use tracing::{info, warn};

/// Spawn a task that flips `tx` to `true` on SIGTERM or SIGINT.
///
/// Signal handlers are registered before this returns, so a signal arriving
/// right after startup is not lost. The task does nothing else; the listener
/// observes the flag between datagrams.
pub fn spawn_signal_listener(tx: watch::Sender<bool>) -> tokio::task::JoinHandle<()> {
    let signals = Signals::install();
    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!(signal, "shutdown signal received");
        if tx.send(true).is_err() {
            warn!("listener already stopped");
        }
    })
}

#[cfg(unix)]
struct Signals {
    terminate: Option<tokio::signal::unix::Signal>,
    interrupt: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Signals {
    fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let listen = |kind: SignalKind, name: &'static str| match signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(signal = name, error = %e, "cannot watch signal");
                None
            }
        };

        Self {
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
        }
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = next(self.terminate.as_mut()) => "SIGTERM",
            _ = next(self.interrupt.as_mut()) => "SIGINT",
        }
    }
}

/// Next delivery on `stream`; never resolves for a missing stream.
#[cfg(unix)]
async fn next(stream: Option<&mut tokio::signal::unix::Signal>) {
    match stream {
        Some(stream) => {
            stream.recv().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> Self {
        Self
    }

    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot watch Ctrl-C");
            // Never resolve rather than shut down spuriously.
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}
