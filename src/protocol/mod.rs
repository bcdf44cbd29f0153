//! Protocol tags and per-protocol configuration
//!
//! Every node speaks exactly one wire protocol. [`Protocol`] is the tag and
//! [`ProtocolConfig`] is the tagged union carrying the matching payload, so a
//! node can never hold two protocol configs at once.
//!
//! # Supported Protocols
//!
//! | Tag           | Config                   | URI scheme     |
//! |---------------|--------------------------|----------------|
//! | `shadowsocks` | [`ShadowsocksConfig`]    | `ss://`        |
//! | `trojan`      | [`TrojanConfig`]         | `trojan://`    |
//! | `vless`       | [`VlessConfig`]          | `vless://`     |
//! | `vmess`       | [`VmessConfig`]          | `vmess://`     |
//! | `hysteria2`   | [`Hysteria2Config`]      | `hysteria2://` |
//! | `tuic`        | [`TuicConfig`]           | `tuic://`      |
//! | `anytls`      | [`AnyTlsConfig`]         | `anytls://`    |

mod anytls;
mod hysteria2;
mod tls;
mod transport;
mod trojan;
mod tuic;
mod vless;
mod vmess;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use anytls::AnyTlsConfig;
pub use hysteria2::{Hysteria2Config, Hysteria2Obfs};
pub use tls::{Fingerprint, TlsOptions};
pub use transport::Transport;
pub use trojan::TrojanConfig;
pub use tuic::{CongestionControl, TuicConfig, UdpRelayMode};
pub use vless::{RealityOptions, VlessConfig, VlessFlow, VlessSecurity};
pub use vmess::{VmessCipher, VmessConfig};

pub use crate::shadowsocks::ShadowsocksConfig;
use crate::error::ValidationError;

/// Wire protocol spoken by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Shadowsocks (AEAD)
    Shadowsocks,
    /// Trojan over TLS
    Trojan,
    /// VLESS
    Vless,
    /// VMess
    Vmess,
    /// Hysteria 2 over QUIC
    Hysteria2,
    /// TUIC v5 over QUIC
    Tuic,
    /// AnyTLS
    #[serde(rename = "anytls")]
    AnyTls,
}

impl Protocol {
    /// All protocols, in declaration order
    pub const ALL: [Self; 7] = [
        Self::Shadowsocks,
        Self::Trojan,
        Self::Vless,
        Self::Vmess,
        Self::Hysteria2,
        Self::Tuic,
        Self::AnyTls,
    ];

    /// Get the protocol tag as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Shadowsocks => "shadowsocks",
            Self::Trojan => "trojan",
            Self::Vless => "vless",
            Self::Vmess => "vmess",
            Self::Hysteria2 => "hysteria2",
            Self::Tuic => "tuic",
            Self::AnyTls => "anytls",
        }
    }

    /// URI scheme used in subscription links
    #[must_use]
    pub const fn uri_scheme(&self) -> &'static str {
        match self {
            Self::Shadowsocks => "ss",
            Self::Trojan => "trojan",
            Self::Vless => "vless",
            Self::Vmess => "vmess",
            Self::Hysteria2 => "hysteria2",
            Self::Tuic => "tuic",
            Self::AnyTls => "anytls",
        }
    }

    /// Check if the protocol runs over QUIC
    #[must_use]
    pub const fn is_quic(&self) -> bool {
        matches!(self, Self::Hysteria2 | Self::Tuic)
    }

    /// Parse a protocol tag
    ///
    /// Accepts the canonical tags case-insensitively, plus `ss` as an alias
    /// for Shadowsocks.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnsupportedProtocol` for unknown tags.
    pub fn parse_tag(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "shadowsocks" | "ss" => Ok(Self::Shadowsocks),
            "trojan" => Ok(Self::Trojan),
            "vless" => Ok(Self::Vless),
            "vmess" => Ok(Self::Vmess),
            "hysteria2" | "hy2" => Ok(Self::Hysteria2),
            "tuic" => Ok(Self::Tuic),
            "anytls" => Ok(Self::AnyTls),
            _ => Err(ValidationError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_tag(s)
    }
}

/// Protocol-specific configuration of a node
///
/// Exactly one variant is populated; the variant determines the node's
/// protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", content = "settings", rename_all = "lowercase")]
pub enum ProtocolConfig {
    Shadowsocks(ShadowsocksConfig),
    Trojan(TrojanConfig),
    Vless(VlessConfig),
    Vmess(VmessConfig),
    Hysteria2(Hysteria2Config),
    Tuic(TuicConfig),
    #[serde(rename = "anytls")]
    AnyTls(AnyTlsConfig),
}

impl ProtocolConfig {
    /// Protocol this config belongs to
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        match self {
            Self::Shadowsocks(_) => Protocol::Shadowsocks,
            Self::Trojan(_) => Protocol::Trojan,
            Self::Vless(_) => Protocol::Vless,
            Self::Vmess(_) => Protocol::Vmess,
            Self::Hysteria2(_) => Protocol::Hysteria2,
            Self::Tuic(_) => Protocol::Tuic,
            Self::AnyTls(_) => Protocol::AnyTls,
        }
    }

    /// Validate the wrapped config
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of the wrapped config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Shadowsocks(c) => c.validate(),
            Self::Trojan(c) => c.validate(),
            Self::Vless(c) => c.validate(),
            Self::Vmess(c) => c.validate(),
            Self::Hysteria2(c) => c.validate(),
            Self::Tuic(c) => c.validate(),
            Self::AnyTls(c) => c.validate(),
        }
    }

    /// Ensure this config matches the given protocol tag
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfigMismatch` if the tags differ.
    pub fn ensure_protocol(&self, protocol: Protocol) -> Result<(), ValidationError> {
        if self.protocol() == protocol {
            Ok(())
        } else {
            Err(ValidationError::ConfigMismatch {
                protocol,
                config: self.protocol(),
            })
        }
    }

    /// Shadowsocks payload, if this is a Shadowsocks config
    #[must_use]
    pub const fn as_shadowsocks(&self) -> Option<&ShadowsocksConfig> {
        match self {
            Self::Shadowsocks(c) => Some(c),
            _ => None,
        }
    }

    /// Trojan payload, if this is a Trojan config
    #[must_use]
    pub const fn as_trojan(&self) -> Option<&TrojanConfig> {
        match self {
            Self::Trojan(c) => Some(c),
            _ => None,
        }
    }

    /// AnyTLS payload, if this is an AnyTLS config
    #[must_use]
    pub const fn as_anytls(&self) -> Option<&AnyTlsConfig> {
        match self {
            Self::AnyTls(c) => Some(c),
            _ => None,
        }
    }
}

impl From<ShadowsocksConfig> for ProtocolConfig {
    fn from(c: ShadowsocksConfig) -> Self {
        Self::Shadowsocks(c)
    }
}

impl From<TrojanConfig> for ProtocolConfig {
    fn from(c: TrojanConfig) -> Self {
        Self::Trojan(c)
    }
}

impl From<VlessConfig> for ProtocolConfig {
    fn from(c: VlessConfig) -> Self {
        Self::Vless(c)
    }
}

impl From<VmessConfig> for ProtocolConfig {
    fn from(c: VmessConfig) -> Self {
        Self::Vmess(c)
    }
}

impl From<Hysteria2Config> for ProtocolConfig {
    fn from(c: Hysteria2Config) -> Self {
        Self::Hysteria2(c)
    }
}

impl From<TuicConfig> for ProtocolConfig {
    fn from(c: TuicConfig) -> Self {
        Self::Tuic(c)
    }
}

impl From<AnyTlsConfig> for ProtocolConfig {
    fn from(c: AnyTlsConfig) -> Self {
        Self::AnyTls(c)
    }
}
