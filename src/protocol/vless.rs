//! VLESS node configuration
//!
//! VLESS carries no encryption of its own; confidentiality comes from the
//! security layer, which is either plain TLS or REALITY.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{Fingerprint, Protocol, TlsOptions, Transport};
use crate::error::ValidationError;

/// X25519 public key size in bytes
const REALITY_PUBLIC_KEY_SIZE: usize = 32;

/// Maximum REALITY short ID length in hex characters (8 bytes)
const REALITY_SHORT_ID_MAX_HEX: usize = 16;

/// VLESS flow control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VlessFlow {
    /// XTLS Vision
    #[serde(rename = "xtls-rprx-vision")]
    XtlsRprxVision,
}

impl VlessFlow {
    /// Flow name as used in share links
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::XtlsRprxVision => "xtls-rprx-vision",
        }
    }
}

/// REALITY client parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealityOptions {
    /// Camouflage server name (SNI)
    pub server_name: String,

    /// Server X25519 public key, base64url
    pub public_key: String,

    /// Short ID, hex, up to 8 bytes
    #[serde(default)]
    pub short_id: String,

    /// uTLS fingerprint (REALITY requires one; defaults to chrome)
    #[serde(default = "default_reality_fingerprint")]
    pub fingerprint: Fingerprint,

    /// Spider initial path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
}

fn default_reality_fingerprint() -> Fingerprint {
    Fingerprint::Chrome
}

impl RealityOptions {
    /// Create REALITY options
    #[must_use]
    pub fn new(
        server_name: impl Into<String>,
        public_key: impl Into<String>,
        short_id: impl Into<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            public_key: public_key.into(),
            short_id: short_id.into(),
            fingerprint: default_reality_fingerprint(),
            spider_x: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !crate::node::is_valid_domain(&self.server_name) {
            return Err(ValidationError::protocol_config(
                Protocol::Vless,
                format!("invalid REALITY server name '{}'", self.server_name),
            ));
        }

        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(self.public_key.trim_end_matches('='))
            .map_err(|e| {
                ValidationError::protocol_config(
                    Protocol::Vless,
                    format!("invalid REALITY public key: {e}"),
                )
            })?;
        if decoded.len() != REALITY_PUBLIC_KEY_SIZE {
            return Err(ValidationError::protocol_config(
                Protocol::Vless,
                format!(
                    "invalid REALITY public key length: {} (expected {})",
                    decoded.len(),
                    REALITY_PUBLIC_KEY_SIZE
                ),
            ));
        }

        if self.short_id.len() > REALITY_SHORT_ID_MAX_HEX {
            return Err(ValidationError::protocol_config(
                Protocol::Vless,
                format!(
                    "REALITY short ID too long: {} hex chars (max {})",
                    self.short_id.len(),
                    REALITY_SHORT_ID_MAX_HEX
                ),
            ));
        }
        hex::decode(&self.short_id).map_err(|e| {
            ValidationError::protocol_config(
                Protocol::Vless,
                format!("invalid REALITY short ID: {e}"),
            )
        })?;

        Ok(())
    }
}

/// VLESS security layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VlessSecurity {
    /// No security layer
    None,
    /// Standard TLS
    Tls(TlsOptions),
    /// REALITY
    Reality(RealityOptions),
}

impl Default for VlessSecurity {
    fn default() -> Self {
        Self::Tls(TlsOptions::default())
    }
}

impl VlessSecurity {
    /// Security name used in share links
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tls(_) => "tls",
            Self::Reality(_) => "reality",
        }
    }
}

/// VLESS configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlessConfig {
    /// Stream transport
    #[serde(default)]
    pub transport: Transport,

    /// Security layer
    #[serde(default)]
    pub security: VlessSecurity,

    /// Flow control (Vision requires raw TCP with TLS or REALITY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<VlessFlow>,
}

impl VlessConfig {
    /// Create a VLESS config with the given security layer over raw TCP
    #[must_use]
    pub fn new(security: VlessSecurity) -> Self {
        Self {
            transport: Transport::Tcp,
            security,
            flow: None,
        }
    }

    /// Set the transport
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Set the flow
    #[must_use]
    pub fn with_flow(mut self, flow: VlessFlow) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the transport or security options are invalid,
    /// or a flow is set on a transport/security combination that cannot
    /// carry it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.transport.validate(Protocol::Vless)?;

        match self.security {
            VlessSecurity::None => {}
            VlessSecurity::Tls(ref tls) => tls.validate(Protocol::Vless)?,
            VlessSecurity::Reality(ref reality) => reality.validate()?,
        }

        if let Some(flow) = self.flow {
            if !self.transport.is_tcp() || matches!(self.security, VlessSecurity::None) {
                return Err(ValidationError::protocol_config(
                    Protocol::Vless,
                    format!("flow {} requires tcp transport with tls or reality", flow.as_str()),
                ));
            }
        }

        Ok(())
    }
}
