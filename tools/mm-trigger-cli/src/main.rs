//! mm-trigger: send synchronized triggers and clock checks to playback devices.

use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::UdpSocket;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mm_sync_trigger::{MessageCodec, RelayPayload, SystemClock, Trigger, TriggerTime, WallTime};
use mm_trigger_cli::sender::{ping, send_trigger};
use mm_trigger_cli::targets::resolve_all;
use mm_trigger_cli::{CliError, DEFAULT_PORT};

/// Send synchronized triggers and clock checks to Media-Mux trigger nodes
#[derive(Parser, Debug)]
#[command(name = "mm-trigger", version)]
struct Cli {
    /// Port used for targets given without one
    #[arg(short, long, default_value_t = DEFAULT_PORT, global = true)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ping each target and print round-trip time and clock offset
    Ping {
        /// Devices as host, host:port, ip or ip:port
        #[arg(required = true)]
        targets: Vec<String>,

        /// How long to wait for each pong
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },

    /// Send one trigger datagram to every target
    Trigger {
        /// Devices as host, host:port, ip or ip:port
        #[arg(required = true)]
        targets: Vec<String>,

        /// JSON command forwarded verbatim to each device's media player
        #[arg(long)]
        rpc: String,

        #[command(flatten)]
        when: When,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct When {
    /// Fire this many seconds after each device receives the trigger
    #[arg(long)]
    delay: Option<f64>,

    /// Fire at this wall-clock instant (epoch seconds)
    #[arg(long)]
    at: Option<f64>,
}

impl When {
    fn trigger_time(&self) -> Result<TriggerTime> {
        match (self.delay, self.at) {
            (Some(delay), None) => Ok(TriggerTime::Relative(delay)),
            (None, Some(at)) => Ok(TriggerTime::Absolute(WallTime::from_secs_f64(at))),
            _ => bail!("exactly one of --delay or --at is required"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let codec = MessageCodec::default();
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("failed to bind local UDP socket")?;

    match cli.command {
        Command::Ping {
            targets,
            timeout_ms,
        } => {
            let addrs = resolve_all(&targets, cli.port).await?;
            let clock = SystemClock::new();
            let wait = Duration::from_millis(timeout_ms);
            let mut missing = 0;

            for addr in addrs {
                match ping(&socket, &codec, &clock, addr, wait).await {
                    Ok(report) => println!(
                        "{:<24} rtt {:>8.3} ms  offset {:>+9.3} ms",
                        report.target,
                        report.rtt.as_secs_f64() * 1000.0,
                        report.offset_secs * 1000.0
                    ),
                    Err(CliError::Timeout(addr)) => {
                        println!("{addr:<24} no reply");
                        missing += 1;
                    }
                    Err(e) => {
                        warn!(%addr, error = %e, "ping failed");
                        println!("{addr:<24} error: {e}");
                        missing += 1;
                    }
                }
            }

            Ok(if missing == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Trigger { targets, rpc, when } => {
            let trigger = Trigger {
                time: when.trigger_time()?,
                payload: RelayPayload::new(rpc.into_bytes()),
            };
            let addrs = resolve_all(&targets, cli.port).await?;
            let bytes = send_trigger(&socket, &codec, &trigger, &addrs).await?;
            println!("sent {bytes}-byte trigger to {} device(s)", addrs.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}
