//! Configuration types for node-core

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol::Protocol;

/// Accepted log levels
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CoreConfig {
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Node policy
    #[serde(default)]
    pub node: NodePolicy,
}

impl CoreConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log.validate()?;
        self.node.validate()?;
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: true,
        }
    }
}

impl LogConfig {
    /// Check if JSON output is selected
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Validate logging configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unknown level or format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}",
                self.level
            )));
        }

        match self.format.to_lowercase().as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid log format: {other} (expected 'json' or 'text')"
            ))),
        }
    }
}

/// Thresholds applied to node queries
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodePolicy {
    /// A node is online if its agent reported within this many seconds
    #[serde(default = "default_online_window_secs")]
    pub online_window_secs: u64,

    /// A node is expiring soon within this many days of its expiry
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: u32,

    /// Remarks for subscription links; `{name}` and `{protocol}` are substituted
    #[serde(default = "default_remarks_template")]
    pub default_remarks_template: String,
}

impl Default for NodePolicy {
    fn default() -> Self {
        Self {
            online_window_secs: default_online_window_secs(),
            expiring_soon_days: default_expiring_soon_days(),
            default_remarks_template: default_remarks_template(),
        }
    }
}

impl NodePolicy {
    /// Online window as a duration
    #[must_use]
    pub fn online_window(&self) -> Duration {
        Duration::seconds(i64::try_from(self.online_window_secs).unwrap_or(i64::MAX))
    }

    /// Expiring-soon window as a duration
    #[must_use]
    pub fn expiring_soon_window(&self) -> Duration {
        Duration::days(i64::from(self.expiring_soon_days))
    }

    /// Render the remarks template for a node
    #[must_use]
    pub fn render_remarks(&self, name: &str, protocol: Protocol) -> String {
        self.default_remarks_template
            .replace("{name}", name)
            .replace("{protocol}", protocol.as_str())
    }

    /// Validate node policy
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for a zero or oversized online
    /// window, or an empty remarks template.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.online_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "online_window_secs must be greater than 0".into(),
            ));
        }

        // chrono durations are bounded by i64 milliseconds
        if self.online_window_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::ValidationError(format!(
                "online_window_secs must be at most {MAX_WINDOW_SECS}"
            )));
        }

        if self.default_remarks_template.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_remarks_template cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Upper bound for the online window (one year)
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

// Default value functions

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_online_window_secs() -> u64 {
    300
}

fn default_expiring_soon_days() -> u32 {
    7
}

fn default_remarks_template() -> String {
    "{name}".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.node.online_window(), Duration::minutes(5));
        assert_eq!(config.node.expiring_soon_window(), Duration::days(7));
        assert!(!config.log.is_json());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = CoreConfig::default();
        config.log.level = "verbose".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = CoreConfig::default();
        config.log.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_online_window() {
        let mut policy = NodePolicy {
            online_window_secs: 0,
            ..NodePolicy::default()
        };
        assert!(policy.validate().is_err());

        policy.online_window_secs = MAX_WINDOW_SECS + 1;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_render_remarks() {
        let policy = NodePolicy {
            default_remarks_template: "{name} [{protocol}]".into(),
            ..NodePolicy::default()
        };
        assert_eq!(
            policy.render_remarks("Tokyo 01", Protocol::Hysteria2),
            "Tokyo 01 [hysteria2]"
        );
        assert_eq!(
            NodePolicy::default().render_remarks("Tokyo 01", Protocol::Trojan),
            "Tokyo 01"
        );
    }
}
