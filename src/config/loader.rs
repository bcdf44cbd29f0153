//! Reading [`CoreConfig`] from JSON and the process environment
//!
//! Values are validated after every source has been applied, so a bad
//! override is rejected the same way a bad file is.

use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use super::types::CoreConfig;
use crate::error::ConfigError;

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "NODE_CORE_LOG_LEVEL";

/// Environment variable overriding the online window
pub const ENV_ONLINE_WINDOW_SECS: &str = "NODE_CORE_ONLINE_WINDOW_SECS";

/// Environment variable overriding the expiring-soon window
pub const ENV_EXPIRING_SOON_DAYS: &str = "NODE_CORE_EXPIRING_SOON_DAYS";

/// Read and validate a JSON config file
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` for a missing file, otherwise
/// whatever reading, parsing or validation reports.
pub fn load_config(path: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    debug!(?path, "reading node-core configuration");
    let config = parse(&std::fs::read_to_string(path)?)
        .map_err(|e| ConfigError::ParseError(format!("{e} ({})", path.display())))?;
    config.validate()?;

    info!(
        online_window_secs = config.node.online_window_secs,
        expiring_soon_days = config.node.expiring_soon_days,
        "configuration loaded"
    );
    Ok(config)
}

/// Parse and validate config JSON held in memory
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<CoreConfig, ConfigError> {
    let config = parse(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn parse(json: &str) -> Result<CoreConfig, serde_json::Error> {
    serde_json::from_str(json)
}

/// [`load_config`] followed by [`apply_env_overrides`]
///
/// Recognized variables: `NODE_CORE_LOG_LEVEL`,
/// `NODE_CORE_ONLINE_WINDOW_SECS` and `NODE_CORE_EXPIRING_SOON_DAYS`.
///
/// # Errors
///
/// Returns `ConfigError` if the file or an override is invalid.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Overlay environment variables onto `config` and re-validate it
///
/// # Errors
///
/// Returns `ConfigError::EnvError` for unparsable values, or
/// `ConfigError::ValidationError` if the result is invalid.
pub fn apply_env_overrides(config: &mut CoreConfig) -> Result<(), ConfigError> {
    if let Some(level) = env_override::<String>(ENV_LOG_LEVEL)? {
        config.log.level = level;
    }
    if let Some(secs) = env_override(ENV_ONLINE_WINDOW_SECS)? {
        config.node.online_window_secs = secs;
    }
    if let Some(days) = env_override(ENV_EXPIRING_SOON_DAYS)? {
        config.node.expiring_soon_days = days;
    }
    config.validate()
}

fn env_override<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    let value = raw.trim().parse().map_err(|_| ConfigError::EnvError {
        name: name.to_string(),
        reason: format!("cannot parse '{raw}'"),
    })?;
    debug!(variable = name, value = %raw, "config override from environment");
    Ok(Some(value))
}

/// Write the default configuration as pretty JSON
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(&CoreConfig::default())
        .map_err(|e| ConfigError::ParseError(format!("cannot serialize defaults: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}
