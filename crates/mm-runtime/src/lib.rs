//! # Media-Mux Trigger Node Runtime
//!
//! Process-level concerns around the trigger service.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`MM_LOG_LEVEL`, `MM_JSON_LOGS`)
//! 2. Load configuration (`MM_TRIGGER_CONFIG` file, then `MM_*` overrides)
//! 3. Bind the UDP socket (failure exits non-zero)
//! 4. Install SIGTERM/SIGINT handling
//! 5. Serve until signalled, then log totals

pub mod node;
pub mod settings;
pub mod shutdown;
pub mod telemetry;

pub use node::TriggerNode;
pub use settings::{load_config, load_config_with, CONFIG_PATH_VAR};
pub use shutdown::spawn_signal_listener;
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
