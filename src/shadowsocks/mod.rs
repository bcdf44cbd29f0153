//! Shadowsocks node settings
//!
//! This module provides the Shadowsocks-specific value objects of a node:
//! the cipher/password pair and the optional SIP003 obfuscation plugin.
//!
//! # Supported Ciphers
//!
//! - `aes-256-gcm` (default)
//! - `aes-128-gcm`
//! - `chacha20-ietf-poly1305`
//!
//! # Supported Plugins
//!
//! - `obfs-local` (modes `http`, `tls`)
//! - `v2ray-plugin` (modes `websocket`, `quic`)
//!
//! # Example
//!
//! ```
//! use node_core::shadowsocks::{EncryptionConfig, PluginConfig, ShadowsocksConfig};
//!
//! let config = ShadowsocksConfig::new(EncryptionConfig::new("aes-256-gcm", "password123")?)
//!     .with_plugin(PluginConfig::new("obfs-local", "http", Some("www.bing.com"))?);
//! assert!(config.validate().is_ok());
//! # Ok::<(), node_core::ValidationError>(())
//! ```

mod config;
mod plugin;

pub use config::{
    EncryptionConfig, ShadowsocksConfig, ShadowsocksMethod, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN,
};
pub use plugin::{PluginConfig, PluginKind};
