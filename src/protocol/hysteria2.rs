//! Hysteria2 node configuration

use serde::{Deserialize, Serialize};

use super::{Protocol, TlsOptions};
use crate::error::ValidationError;

/// Hysteria2 obfuscation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Hysteria2Obfs {
    /// Salamander packet obfuscation
    Salamander {
        /// Obfuscation password
        password: String,
    },
}

impl Hysteria2Obfs {
    /// Obfuscation type name used in share links
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Salamander { .. } => "salamander",
        }
    }

    /// Obfuscation password
    #[must_use]
    pub fn password(&self) -> &str {
        match self {
            Self::Salamander { password } => password,
        }
    }
}

/// Hysteria2 configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hysteria2Config {
    /// Upload bandwidth hint in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_mbps: Option<u32>,

    /// Download bandwidth hint in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_mbps: Option<u32>,

    /// Optional obfuscation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<Hysteria2Obfs>,

    /// TLS client options
    #[serde(default)]
    pub tls: TlsOptions,
}

impl Hysteria2Config {
    /// Create a Hysteria2 config with the given TLS options
    #[must_use]
    pub fn new(tls: TlsOptions) -> Self {
        Self {
            tls,
            ..Self::default()
        }
    }

    /// Enable salamander obfuscation
    #[must_use]
    pub fn with_salamander(mut self, password: impl Into<String>) -> Self {
        self.obfs = Some(Hysteria2Obfs::Salamander {
            password: password.into(),
        });
        self
    }

    /// Set bandwidth hints
    #[must_use]
    pub fn with_bandwidth(mut self, up_mbps: u32, down_mbps: u32) -> Self {
        self.up_mbps = Some(up_mbps);
        self.down_mbps = Some(down_mbps);
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for zero bandwidth hints, an empty obfuscation
    /// password, or invalid TLS options.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.up_mbps == Some(0) || self.down_mbps == Some(0) {
            return Err(ValidationError::protocol_config(
                Protocol::Hysteria2,
                "bandwidth hints must be greater than 0",
            ));
        }

        if let Some(ref obfs) = self.obfs {
            if obfs.password().is_empty() {
                return Err(ValidationError::protocol_config(
                    Protocol::Hysteria2,
                    "obfuscation password cannot be empty",
                ));
            }
        }

        self.tls.validate(Protocol::Hysteria2)
    }
}
