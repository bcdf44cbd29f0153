//! TLS client options shared by TLS- and QUIC-based protocols

use serde::{Deserialize, Serialize};

use super::Protocol;
use crate::error::ValidationError;
use crate::node::is_valid_domain;

/// uTLS client fingerprint advertised to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fingerprint {
    Chrome,
    Firefox,
    Safari,
    Ios,
    Android,
    Edge,
    #[serde(rename = "360")]
    Qihoo360,
    Qq,
    Random,
    Randomized,
}

impl Fingerprint {
    /// Get the fingerprint name as used in share links
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Edge => "edge",
            Self::Qihoo360 => "360",
            Self::Qq => "qq",
            Self::Random => "random",
            Self::Randomized => "randomized",
        }
    }

    /// Parse a fingerprint name
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFingerprint` for unknown names.
    pub fn parse_name(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "safari" => Ok(Self::Safari),
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "edge" => Ok(Self::Edge),
            "360" => Ok(Self::Qihoo360),
            "qq" => Ok(Self::Qq),
            "random" => Ok(Self::Random),
            "randomized" => Ok(Self::Randomized),
            other => Err(ValidationError::InvalidFingerprint(other.to_string())),
        }
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS options handed to clients in subscription links
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Server Name Indication; clients use the server address when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    /// uTLS fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,

    /// ALPN protocols (e.g. ["h2", "http/1.1"])
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    /// Skip certificate verification on the client (self-signed certs)
    #[serde(default)]
    pub allow_insecure: bool,
}

impl TlsOptions {
    /// Create TLS options with an SNI
    #[must_use]
    pub fn with_sni(sni: impl Into<String>) -> Self {
        Self {
            sni: Some(sni.into()),
            ..Self::default()
        }
    }

    /// Set the fingerprint
    #[must_use]
    pub fn fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Set ALPN protocols
    #[must_use]
    pub fn alpn<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alpn = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Allow insecure certificates on the client
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.allow_insecure = true;
        self
    }

    /// ALPN list joined for share links
    #[must_use]
    pub fn alpn_param(&self) -> Option<String> {
        if self.alpn.is_empty() {
            None
        } else {
            Some(self.alpn.join(","))
        }
    }

    /// Validate the options on behalf of `protocol`
    ///
    /// # Errors
    ///
    /// Returns an error if the SNI is not a domain or an ALPN entry is empty.
    pub fn validate(&self, protocol: Protocol) -> Result<(), ValidationError> {
        if let Some(ref sni) = self.sni {
            if !is_valid_domain(sni) {
                return Err(ValidationError::protocol_config(
                    protocol,
                    format!("invalid SNI '{sni}'"),
                ));
            }
        }

        if self.alpn.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::protocol_config(
                protocol,
                "ALPN entries cannot be empty",
            ));
        }

        Ok(())
    }
}
