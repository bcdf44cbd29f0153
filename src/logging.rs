//! Logging setup for hosts embedding node-core
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own can install the standard one with [`init_logging`].

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::ConfigError;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` directives are honored on top of the configured level.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` for an invalid config, or
/// `ConfigError::Logging` if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let filter = EnvFilter::from_default_env().add_directive(parse_level(&config.level).into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.target);

    let result = if config.is_json() {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
