//! Configuration loading: optional TOML file, then `MM_*` overrides.

use std::env;

use mm_sync_trigger::{ConfigError, TriggerConfig};
use tracing::info;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_VAR: &str = "MM_TRIGGER_CONFIG";

/// Load configuration from the process environment.
pub fn load_config() -> Result<TriggerConfig, ConfigError> {
    load_config_with(|key| env::var(key).ok())
}

/// Load configuration through `lookup`.
///
/// # Errors
///
/// Unreadable or invalid config file, or a final configuration that fails
/// validation after overrides.
pub fn load_config_with<F>(lookup: F) -> Result<TriggerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_PATH_VAR) {
        Some(path) => {
            info!(%path, "loading configuration file");
            TriggerConfig::load(&path)?
        }
        None => TriggerConfig::default(),
    };

    config.apply_env(&lookup);
    config.validate()?;
    Ok(config)
}
