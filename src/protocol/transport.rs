//! Stream transports for V2Ray-family protocols (Trojan, VLESS, VMess)

use serde::{Deserialize, Serialize};

use super::Protocol;
use crate::error::ValidationError;

/// Transport carrying the proxy stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transport {
    /// Raw TCP (default)
    Tcp,

    /// WebSocket
    Ws {
        /// Request path, must start with `/`
        #[serde(default = "default_path")]
        path: String,
        /// Host header override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
    },

    /// gRPC
    Grpc {
        /// gRPC service name
        service_name: String,
    },

    /// HTTP upgrade
    #[serde(rename = "httpupgrade")]
    HttpUpgrade {
        /// Request path, must start with `/`
        #[serde(default = "default_path")]
        path: String,
        /// Host header override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
    },
}

fn default_path() -> String {
    "/".into()
}

impl Default for Transport {
    fn default() -> Self {
        Self::Tcp
    }
}

impl Transport {
    /// Create a WebSocket transport
    #[must_use]
    pub fn ws(path: impl Into<String>) -> Self {
        Self::Ws {
            path: path.into(),
            host: None,
        }
    }

    /// Create a gRPC transport
    #[must_use]
    pub fn grpc(service_name: impl Into<String>) -> Self {
        Self::Grpc {
            service_name: service_name.into(),
        }
    }

    /// Network name used in share links (`type=` / `net`)
    #[must_use]
    pub const fn network(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ws { .. } => "ws",
            Self::Grpc { .. } => "grpc",
            Self::HttpUpgrade { .. } => "httpupgrade",
        }
    }

    /// Check if this is raw TCP
    #[must_use]
    pub const fn is_tcp(&self) -> bool {
        matches!(self, Self::Tcp)
    }

    /// Path for path-based transports
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Ws { path, .. } | Self::HttpUpgrade { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Host header for path-based transports
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Ws { host, .. } | Self::HttpUpgrade { host, .. } => host.as_deref(),
            _ => None,
        }
    }

    /// gRPC service name
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::Grpc { service_name } => Some(service_name),
            _ => None,
        }
    }

    /// Validate on behalf of `protocol`
    ///
    /// # Errors
    ///
    /// Returns an error for a path not starting with `/` or an empty gRPC
    /// service name.
    pub fn validate(&self, protocol: Protocol) -> Result<(), ValidationError> {
        match self {
            Self::Tcp => Ok(()),
            Self::Ws { path, .. } | Self::HttpUpgrade { path, .. } => {
                if path.starts_with('/') {
                    Ok(())
                } else {
                    Err(ValidationError::protocol_config(
                        protocol,
                        format!("{} path must start with '/': {path}", self.network()),
                    ))
                }
            }
            Self::Grpc { service_name } => {
                if service_name.trim().is_empty() {
                    Err(ValidationError::protocol_config(
                        protocol,
                        "gRPC service name cannot be empty",
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}
