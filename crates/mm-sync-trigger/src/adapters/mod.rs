//! # Adapters Layer
//!
//! Concrete implementations of the ports:
//!
//! - `clock`: `SystemClock` (wall `SystemTime`, monotonic `Instant`, tokio timer)
//! - `http`: `HttpCommandEndpoint` (pre-connected HTTP/1.1 POST)
//! - `udp`: `UdpListener` (receive loop driving a `DatagramHandler`)
//! - `config`: `TriggerConfig` (TOML + environment overrides)

pub mod clock;
pub mod config;
pub mod http;
pub mod udp;

pub use clock::SystemClock;
pub use config::{parse_prefix_list, ConfigError, TriggerConfig, MAX_UDP_PAYLOAD, MAX_WINDOW_SECS};
pub use http::{HttpCommandEndpoint, HttpPreparedCommand, DEFAULT_ENDPOINT_PATH};
pub use udp::{ListenerError, UdpListener};
