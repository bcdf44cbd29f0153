//! SIP003 plugin configuration
//!
//! Two plugins are supported:
//!
//! | Plugin          | Modes             | Option keys           |
//! |-----------------|-------------------|-----------------------|
//! | `obfs-local`    | `http`, `tls`     | `obfs`, `obfs-host`   |
//! | `v2ray-plugin`  | `websocket`, `quic` | `mode`, `host`      |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Obfuscation plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    /// simple-obfs client
    #[serde(rename = "obfs-local")]
    ObfsLocal,
    /// v2ray-plugin
    #[serde(rename = "v2ray-plugin")]
    V2rayPlugin,
}

impl PluginKind {
    /// Plugin binary name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ObfsLocal => "obfs-local",
            Self::V2rayPlugin => "v2ray-plugin",
        }
    }

    /// Modes accepted by this plugin
    #[must_use]
    pub const fn modes(&self) -> &'static [&'static str] {
        match self {
            Self::ObfsLocal => &["http", "tls"],
            Self::V2rayPlugin => &["websocket", "quic"],
        }
    }

    const fn mode_key(&self) -> &'static str {
        match self {
            Self::ObfsLocal => "obfs",
            Self::V2rayPlugin => "mode",
        }
    }

    const fn host_key(&self) -> &'static str {
        match self {
            Self::ObfsLocal => "obfs-host",
            Self::V2rayPlugin => "host",
        }
    }

    /// Parse a plugin name
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPlugin` for unknown plugins.
    pub fn parse_name(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "obfs-local" => Ok(Self::ObfsLocal),
            "v2ray-plugin" => Ok(Self::V2rayPlugin),
            other => Err(ValidationError::InvalidPlugin(format!("unknown plugin '{other}'"))),
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated plugin configuration
///
/// Equality compares the plugin and its full option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPluginConfig", into = "RawPluginConfig")]
pub struct PluginConfig {
    plugin: PluginKind,
    options: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct RawPluginConfig {
    plugin: String,
    mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
}

impl TryFrom<RawPluginConfig> for PluginConfig {
    type Error = ValidationError;

    fn try_from(raw: RawPluginConfig) -> Result<Self, Self::Error> {
        Self::new(&raw.plugin, &raw.mode, raw.host.as_deref())
    }
}

impl From<PluginConfig> for RawPluginConfig {
    fn from(config: PluginConfig) -> Self {
        Self {
            plugin: config.plugin.as_str().to_string(),
            mode: config.mode().to_string(),
            host: config.host().map(str::to_string),
        }
    }
}

impl PluginConfig {
    /// Create a validated plugin config
    ///
    /// The mode is normalized to lowercase. A non-empty `host` is attached
    /// as the plugin's host option.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPlugin` for an unknown plugin or a
    /// mode the plugin does not support.
    pub fn new(plugin: &str, mode: &str, host: Option<&str>) -> Result<Self, ValidationError> {
        let plugin = PluginKind::parse_name(plugin)?;
        let mode = mode.trim().to_lowercase();
        if !plugin.modes().contains(&mode.as_str()) {
            return Err(ValidationError::InvalidPlugin(format!(
                "{plugin} does not support mode '{mode}' (expected one of: {})",
                plugin.modes().join(", ")
            )));
        }

        let mut options = BTreeMap::new();
        options.insert(plugin.mode_key().to_string(), mode);
        if let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) {
            if host.contains(|c: char| c == ';' || c == '=') {
                return Err(ValidationError::InvalidPlugin(format!(
                    "plugin host cannot contain ';' or '=': {host}"
                )));
            }
            options.insert(plugin.host_key().to_string(), host.to_string());
        }

        Ok(Self { plugin, options })
    }

    /// Plugin kind
    #[must_use]
    pub const fn plugin(&self) -> PluginKind {
        self.plugin
    }

    /// Selected mode
    #[must_use]
    pub fn mode(&self) -> &str {
        self.options
            .get(self.plugin.mode_key())
            .map_or("", String::as_str)
    }

    /// Host option, if set
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.options.get(self.plugin.host_key()).map(String::as_str)
    }

    /// All plugin options
    #[must_use]
    pub const fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Options as `key=value` pairs joined by `;`
    ///
    /// Callers must not depend on the order of the pairs.
    #[must_use]
    pub fn options_string(&self) -> String {
        self.options
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// SIP003 plugin argument: `<plugin>;<options>`
    #[must_use]
    pub fn sip003_string(&self) -> String {
        format!("{};{}", self.plugin.as_str(), self.options_string())
    }

    /// Re-check the mode against the plugin
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPlugin` if the mode is unsupported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.plugin.modes().contains(&self.mode()) {
            Ok(())
        } else {
            Err(ValidationError::InvalidPlugin(format!(
                "{} does not support mode '{}'",
                self.plugin,
                self.mode()
            )))
        }
    }
}
