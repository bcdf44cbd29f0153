//! node-core: proxy node aggregate for a subscription proxy service
//!
//! This crate models the relay endpoints ("nodes") of a proxy fleet. Each
//! node speaks one of seven wire protocols and carries the configuration,
//! lifecycle status and API credential the control plane manages.
//!
//! # Features
//!
//! - **Per-protocol configuration**: Shadowsocks, Trojan, VLESS, VMess,
//!   Hysteria2, TUIC and AnyTLS, each validated on its own terms
//! - **Lifecycle state machine**: inactive, active, maintenance with an
//!   explicit transition table
//! - **Optimistic locking**: every effective change bumps a version;
//!   no-op updates leave it untouched
//! - **Credentials**: SHA-256 hashed node tokens with constant-time checks
//! - **Subscription URIs**: `ss://`, `trojan://`, `vless://`, `vmess://`,
//!   `hysteria2://`, `tuic://` and `anytls://` share links
//!
//! # Architecture
//!
//! ```text
//! NodeDraft ─▶ Node::create ─▶ Node ─▶ NodeRepository (host)
//!                               │
//!                               ├─▶ NodeRegistry (in-memory lookup)
//!                               └─▶ SubscriptionUriFactory ─▶ share link
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`logging`]: `tracing` subscriber setup
//! - [`node`]: Node aggregate, value objects, registry and ports
//! - [`protocol`]: Protocol tags and per-protocol configuration
//! - [`shadowsocks`]: Shadowsocks cipher and plugin settings
//! - [`subscription`]: Subscription URI builders

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod protocol;
pub mod shadowsocks;
pub mod subscription;

// Re-export commonly used types at the crate root
pub use config::{load_config, CoreConfig, LogConfig, NodePolicy};
pub use error::{
    ConfigError, NodeError, NodeResult, RepositoryError, SubscriptionError, TransitionError,
    ValidationError,
};
pub use logging::init_logging;
pub use node::{
    IdGenerator, Node, NodeDraft, NodeRecord, NodeRegistry, NodeRepository, NodeStatus,
    NodeToken, ServerAddress, UuidIdGenerator,
};
pub use protocol::{Protocol, ProtocolConfig};
pub use shadowsocks::{EncryptionConfig, PluginConfig};
pub use subscription::{SubscriptionUriFactory, UriBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
