//! Trojan node configuration

use serde::{Deserialize, Serialize};

use super::{Protocol, TlsOptions, Transport};
use crate::error::ValidationError;

/// Trojan configuration
///
/// Trojan always runs over TLS; only the transport and TLS client hints
/// are configurable. The per-user password is supplied at subscription time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrojanConfig {
    /// Stream transport
    #[serde(default)]
    pub transport: Transport,

    /// TLS client options
    #[serde(default)]
    pub tls: TlsOptions,
}

impl TrojanConfig {
    /// Create a Trojan config over raw TCP
    #[must_use]
    pub fn new(tls: TlsOptions) -> Self {
        Self {
            transport: Transport::Tcp,
            tls,
        }
    }

    /// Set the transport
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the transport or TLS options are invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.transport.validate(Protocol::Trojan)?;
        self.tls.validate(Protocol::Trojan)
    }
}
