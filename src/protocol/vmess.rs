//! VMess node configuration

use serde::{Deserialize, Serialize};

use super::{Protocol, TlsOptions, Transport};
use crate::error::ValidationError;

/// VMess body cipher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VmessCipher {
    /// Let the client choose
    #[default]
    Auto,
    /// aes-128-gcm
    Aes128Gcm,
    /// chacha20-poly1305
    Chacha20Poly1305,
    /// No body encryption (header still authenticated)
    None,
    /// No encryption and no authentication
    Zero,
}

impl VmessCipher {
    /// Cipher name as used in share links (`scy`)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Aes128Gcm => "aes-128-gcm",
            Self::Chacha20Poly1305 => "chacha20-poly1305",
            Self::None => "none",
            Self::Zero => "zero",
        }
    }
}

/// VMess configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmessConfig {
    /// Legacy alter ID; 0 selects AEAD header authentication
    #[serde(default)]
    pub alter_id: u16,

    /// Body cipher
    #[serde(default)]
    pub cipher: VmessCipher,

    /// Stream transport
    #[serde(default)]
    pub transport: Transport,

    /// TLS options, if the stream is wrapped in TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
}

impl VmessConfig {
    /// Create a VMess config with the given cipher over raw TCP
    #[must_use]
    pub fn new(cipher: VmessCipher) -> Self {
        Self {
            cipher,
            ..Self::default()
        }
    }

    /// Set the transport
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Wrap the stream in TLS
    #[must_use]
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the transport or TLS options are invalid, or the
    /// `zero` cipher is used without TLS.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.transport.validate(Protocol::Vmess)?;

        if let Some(ref tls) = self.tls {
            tls.validate(Protocol::Vmess)?;
        } else if self.cipher == VmessCipher::Zero {
            return Err(ValidationError::protocol_config(
                Protocol::Vmess,
                "cipher 'zero' requires TLS",
            ));
        }

        Ok(())
    }
}
