//! Service configuration: TOML file, environment overrides, validation.

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use super::http::DEFAULT_ENDPOINT_PATH;
use crate::domain::{
    AccessFilter, CodecLimits, NetworkPrefix, PrefixParseError, WaitPolicy,
    DEFAULT_MAX_MESSAGE_BYTES,
};

/// Largest payload a single UDP/IPv4 datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Upper bound for either acceptance window.
pub const MAX_WINDOW_SECS: f64 = 86_400.0;

pub const DEFAULT_LISTEN_PORT: u16 = 9199;
pub const DEFAULT_ENDPOINT_PORT: u16 = 8888;

/// Environment variables read by [`TriggerConfig::apply_env`].
pub mod env {
    pub const LISTEN_ADDR: &str = "MM_LISTEN_ADDR";
    pub const ENDPOINT_ADDR: &str = "MM_ENDPOINT_ADDR";
    pub const ALLOWED_PREFIXES: &str = "MM_ALLOWED_PREFIXES";
    pub const MAX_FUTURE_SECS: &str = "MM_MAX_FUTURE_SECS";
    pub const MAX_PAST_SECS: &str = "MM_MAX_PAST_SECS";
    pub const SPIN_THRESHOLD_MS: &str = "MM_SPIN_THRESHOLD_MS";
}

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid allow-list entry: {0}")]
    InvalidPrefix(#[from] PrefixParseError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Trigger service configuration.
///
/// # Config File Format
///
/// ```toml
/// listen_addr = "0.0.0.0:9199"
/// endpoint_addr = "127.0.0.1:8888"
/// endpoint_path = "/jsonrpc"
/// allowed_prefixes = ["192.168.8.0/24"]
/// max_message_bytes = 2048
/// spin_threshold_ms = 5
/// max_future_secs = 10.0
/// max_past_secs = 5.0
/// recv_timeout_ms = 1000
/// io_timeout_ms = 3000
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    pub listen_addr: SocketAddr,
    pub endpoint_addr: SocketAddr,
    pub endpoint_path: String,
    pub allowed_prefixes: Vec<NetworkPrefix>,
    pub max_message_bytes: usize,
    pub spin_threshold_ms: u64,
    pub max_future_secs: f64,
    pub max_past_secs: f64,
    pub recv_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LISTEN_PORT)),
            endpoint_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_ENDPOINT_PORT)),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            allowed_prefixes: vec![NetworkPrefix::from_octets_v4([192, 168, 8, 0], 24)],
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            spin_threshold_ms: 5,
            max_future_secs: 10.0,
            max_past_secs: 5.0,
            recv_timeout_ms: 1000,
            io_timeout_ms: 3000,
        }
    }
}

impl TriggerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window("max_future_secs", self.max_future_secs)?;
        check_window("max_past_secs", self.max_past_secs)?;
        if self.spin_threshold().as_secs_f64() >= self.max_future_secs {
            return Err(ConfigError::Invalid(format!(
                "spin_threshold_ms ({}) must be below max_future_secs ({})",
                self.spin_threshold_ms, self.max_future_secs
            )));
        }
        if self.max_message_bytes == 0 || self.max_message_bytes > MAX_UDP_PAYLOAD {
            return Err(ConfigError::Invalid(format!(
                "max_message_bytes must be in 1..={MAX_UDP_PAYLOAD}, got {}",
                self.max_message_bytes
            )));
        }
        if self.recv_timeout_ms == 0 || self.io_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "endpoint_path must start with '/', got {:?}",
                self.endpoint_path
            )));
        }
        Ok(())
    }

    /// Apply `MM_*` overrides read through `lookup`.
    ///
    /// A value that does not parse is logged and skipped; the rest still apply.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_with(&lookup, env::LISTEN_ADDR, &mut self.listen_addr, |v| v.parse().ok());
        override_with(&lookup, env::ENDPOINT_ADDR, &mut self.endpoint_addr, |v| {
            v.parse().ok()
        });
        override_with(&lookup, env::ALLOWED_PREFIXES, &mut self.allowed_prefixes, |v| {
            parse_prefix_list(v).ok()
        });
        override_with(&lookup, env::MAX_FUTURE_SECS, &mut self.max_future_secs, parse_secs);
        override_with(&lookup, env::MAX_PAST_SECS, &mut self.max_past_secs, parse_secs);
        override_with(&lookup, env::SPIN_THRESHOLD_MS, &mut self.spin_threshold_ms, |v| {
            v.parse().ok()
        });
    }

    pub fn spin_threshold(&self) -> Duration {
        Duration::from_millis(self.spin_threshold_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Scheduler windows. Only meaningful on a validated config.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            max_past: Duration::try_from_secs_f64(self.max_past_secs).unwrap_or_default(),
            max_future: Duration::try_from_secs_f64(self.max_future_secs).unwrap_or_default(),
            spin_threshold: self.spin_threshold(),
        }
    }

    /// Codec bounds; the delay ceiling mirrors the future window.
    pub fn codec_limits(&self) -> CodecLimits {
        CodecLimits {
            max_message_bytes: self.max_message_bytes,
            max_delay_secs: self.max_future_secs,
        }
    }

    pub fn access_filter(&self) -> AccessFilter {
        AccessFilter::new(self.allowed_prefixes.clone())
    }
}

/// Parse a comma separated allow-list. Empty entries are skipped.
pub fn parse_prefix_list(value: &str) -> Result<Vec<NetworkPrefix>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse().map_err(ConfigError::from))
        .collect()
}

fn check_window(name: &str, secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && (0.0..=MAX_WINDOW_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be between 0 and {MAX_WINDOW_SECS}, got {secs}"
        )))
    }
}

fn parse_secs(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

fn override_with<T, L, P>(lookup: &L, key: &str, slot: &mut T, parse: P)
where
    L: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match parse(raw.trim()) {
        Some(value) => *slot = value,
        None => warn!(key, value = %raw, "ignoring malformed environment override"),
    }
}
