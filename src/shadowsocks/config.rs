//! Shadowsocks configuration types
//!
//! This module provides the cipher method enum, the validated
//! [`EncryptionConfig`] value object and the node-level
//! [`ShadowsocksConfig`].
//!
//! # Example
//!
//! ```
//! use node_core::shadowsocks::{EncryptionConfig, ShadowsocksMethod};
//!
//! let enc = EncryptionConfig::new(" AES-256-GCM ", "password123").unwrap();
//! assert_eq!(enc.method(), ShadowsocksMethod::Aes256Gcm);
//! assert_eq!(enc.method().as_str(), "aes-256-gcm");
//! ```

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::plugin::PluginConfig;
use crate::error::ValidationError;

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum password length in characters
pub const MAX_PASSWORD_LEN: usize = 128;

/// Shadowsocks encryption method
///
/// Only the AEAD v1 ciphers are offered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadowsocksMethod {
    /// aes-256-gcm - widely supported default
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,

    /// aes-128-gcm - slightly faster
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,

    /// chacha20-ietf-poly1305 - good for devices without AES-NI
    #[serde(rename = "chacha20-ietf-poly1305")]
    Chacha20IetfPoly1305,
}

impl Default for ShadowsocksMethod {
    fn default() -> Self {
        Self::Aes256Gcm
    }
}

impl ShadowsocksMethod {
    /// Get the method name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::Aes128Gcm => "aes-128-gcm",
            Self::Chacha20IetfPoly1305 => "chacha20-ietf-poly1305",
        }
    }

    /// Check if this is an AES-GCM cipher
    #[must_use]
    pub const fn is_aes(&self) -> bool {
        matches!(self, Self::Aes256Gcm | Self::Aes128Gcm)
    }

    /// Check if this is a ChaCha20 cipher
    #[must_use]
    pub const fn is_chacha(&self) -> bool {
        matches!(self, Self::Chacha20IetfPoly1305)
    }

    /// Key size in bytes
    #[must_use]
    pub const fn key_size(&self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm | Self::Chacha20IetfPoly1305 => 32,
        }
    }

    /// Parse method from string
    ///
    /// Surrounding whitespace and case are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the method string is not recognized.
    pub fn parse_method(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "aes-128-gcm" => Ok(Self::Aes128Gcm),
            "chacha20-ietf-poly1305" => Ok(Self::Chacha20IetfPoly1305),
            _ => Err(ValidationError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for ShadowsocksMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ShadowsocksMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_method(s)
    }
}

/// Validated Shadowsocks cipher + password
///
/// Immutable value object: construct a new one to change either field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEncryptionConfig")]
pub struct EncryptionConfig {
    method: ShadowsocksMethod,
    password: String,
}

#[derive(Deserialize)]
struct RawEncryptionConfig {
    method: String,
    password: String,
}

impl TryFrom<RawEncryptionConfig> for EncryptionConfig {
    type Error = ValidationError;

    fn try_from(raw: RawEncryptionConfig) -> Result<Self, Self::Error> {
        Self::new(&raw.method, raw.password)
    }
}

impl EncryptionConfig {
    /// Create a validated encryption config
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidMethod` for an unknown cipher or
    /// `ValidationError::InvalidPassword` if the password length is outside
    /// `[MIN_PASSWORD_LEN, MAX_PASSWORD_LEN]`.
    pub fn new(method: &str, password: impl Into<String>) -> Result<Self, ValidationError> {
        let method = ShadowsocksMethod::parse_method(method)?;
        let password = password.into();
        validate_password(&password)?;
        Ok(Self { method, password })
    }

    /// Create from an already-parsed method
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPassword` for an out-of-range password.
    pub fn with_method(
        method: ShadowsocksMethod,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let password = password.into();
        validate_password(&password)?;
        Ok(Self { method, password })
    }

    /// Cipher method
    #[must_use]
    pub const fn method(&self) -> ShadowsocksMethod {
        self.method
    }

    /// Password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check if the cipher is AES-GCM
    #[must_use]
    pub const fn is_aes(&self) -> bool {
        self.method.is_aes()
    }

    /// Check if the cipher is ChaCha20
    #[must_use]
    pub const fn is_chacha(&self) -> bool {
        self.method.is_chacha()
    }

    /// SIP002 user-info: `base64url("method:password")` without padding
    #[must_use]
    pub fn auth_fragment(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(format!("{}:{}", self.method.as_str(), self.password))
    }

    /// Re-check the password policy
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPassword` for an out-of-range password.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_password(&self.password)
    }
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("method", &self.method)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters, got {len}"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::InvalidPassword(format!(
            "must be at most {MAX_PASSWORD_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Shadowsocks node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowsocksConfig {
    /// Cipher and server password
    pub encryption: EncryptionConfig,

    /// Optional SIP003 obfuscation plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginConfig>,
}

impl ShadowsocksConfig {
    /// Create a config without a plugin
    #[must_use]
    pub fn new(encryption: EncryptionConfig) -> Self {
        Self {
            encryption,
            plugin: None,
        }
    }

    /// Attach a plugin
    #[must_use]
    pub fn with_plugin(mut self, plugin: PluginConfig) -> Self {
        self.plugin = Some(plugin);
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the encryption or plugin settings are invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.encryption.validate()?;
        if let Some(ref plugin) = self.plugin {
            plugin.validate()?;
        }
        Ok(())
    }
}
