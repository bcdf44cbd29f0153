//! Node aggregate and its value objects
//!
//! # Overview
//!
//! | Type                | Role                                            |
//! |---------------------|-------------------------------------------------|
//! | [`Node`]            | Aggregate root: config, lifecycle, credential   |
//! | [`ServerAddress`]   | IP literal, domain or unset                     |
//! | [`NodeStatus`]      | Lifecycle state machine                         |
//! | [`NodeToken`]       | Hashed API credential                           |
//! | [`NodeRegistry`]    | Concurrent in-memory lookup                     |
//! | [`NodeRepository`]  | Persistence port (implemented by hosts)         |
//!
//! # Example
//!
//! ```
//! use node_core::node::{Node, NodeDraft, UuidIdGenerator};
//! use node_core::shadowsocks::{EncryptionConfig, ShadowsocksConfig};
//!
//! # fn main() -> Result<(), node_core::NodeError> {
//! let encryption = EncryptionConfig::new("aes-256-gcm", "password123")?;
//! let draft = NodeDraft::new("Tokyo 01", "1.2.3.4", 8388, ShadowsocksConfig::new(encryption));
//! let node = Node::create(draft, &UuidIdGenerator)?;
//!
//! node.activate()?;
//! assert!(node.is_available());
//! assert_eq!(node.version(), 2);
//!
//! let uri = node.generate_subscription_uri("", "Tokyo 01")?;
//! assert!(uri.starts_with("ss://"));
//! # Ok(())
//! # }
//! ```

mod address;
mod aggregate;
mod metadata;
mod ports;
mod registry;
mod routing;
mod status;
mod token;

pub use address::{is_valid_domain, uri_host, AddressKind, ServerAddress, MAX_DOMAIN_LEN, MAX_LABEL_LEN};
pub use aggregate::{Node, NodeDraft, NodeRecord};
pub use metadata::{AgentReport, AgentTelemetry, NodeMetadata};
pub use ports::{IdGenerator, NodeFilter, NodeRepository, UuidIdGenerator};
pub use registry::{NodeHandle, NodeRegistry};
pub use routing::{DnsConfig, DnsServer, DnsStrategy, RouteConfig, RouteOutbound, RouteRule};
pub use status::NodeStatus;
pub use token::{
    hash_token, NodeToken, RandomTokenIssuer, TokenIssuer, TOKEN_HASH_HEX_LEN, TOKEN_PREFIX,
    TOKEN_RANDOM_BYTES,
};
