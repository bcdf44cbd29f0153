//! Subscription URI generation
//!
//! Turns a node's protocol configuration into the share link a client app
//! imports. Each protocol owns its grammar through a [`UriBuilder`]; the
//! [`SubscriptionUriFactory`] dispatches on the protocol tag.
//!
//! # Grammars
//!
//! ```text
//! ss://<base64url(method:password)>@host:port[/?plugin=...]#remarks
//! trojan://<password>@host:port?security=tls&type=..#remarks
//! vless://<uuid>@host:port?encryption=none&type=..&security=..#remarks
//! vmess://<base64(json)>
//! hysteria2://<auth>@host:port/?sni=..#remarks
//! tuic://<uuid>:<password>@host:port?congestion_control=..#remarks
//! ```
//!
//! AnyTLS builds its own `anytls://` link (see
//! [`AnyTlsConfig::to_subscription_uri`](crate::protocol::AnyTlsConfig::to_subscription_uri)).
//!
//! # Adding a protocol
//!
//! Implement [`UriBuilder`] and [`register`](SubscriptionUriFactory::register)
//! it; existing builders stay untouched.

mod builders;
mod query;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::trace;

pub use builders::{
    Hysteria2UriBuilder, ShadowsocksUriBuilder, TrojanUriBuilder, TuicUriBuilder,
    VlessUriBuilder, VmessUriBuilder,
};
pub use query::{fragment, QueryString};

use crate::error::SubscriptionError;
use crate::node::uri_host;
use crate::protocol::{Protocol, ProtocolConfig};

/// Host and port a client connects to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host (IP literal or domain)
    pub host: String,
    /// Port
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` with IPv6 hosts bracketed
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", uri_host(&self.host), self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Inputs to a URI builder
#[derive(Debug, Clone, Copy)]
pub struct UriRequest<'a> {
    /// Protocol configuration of the node
    pub config: &'a ProtocolConfig,
    /// Effective endpoint of the node
    pub endpoint: &'a Endpoint,
    /// Subscriber secret (password / UUID / auth, depending on protocol)
    pub password: &'a str,
    /// Display name for the client
    pub remarks: &'a str,
}

/// Builds share links for one protocol
pub trait UriBuilder: Send + Sync {
    /// Protocol this builder serves
    fn protocol(&self) -> Protocol;

    /// Build the URI
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError` if the config belongs to another protocol
    /// or the payload cannot be encoded.
    fn build(&self, request: &UriRequest<'_>) -> Result<String, SubscriptionError>;
}

/// Dispatches URI generation to per-protocol builders
pub struct SubscriptionUriFactory {
    builders: HashMap<Protocol, Arc<dyn UriBuilder>>,
}

static DEFAULT_FACTORY: Lazy<SubscriptionUriFactory> =
    Lazy::new(SubscriptionUriFactory::with_default_builders);

impl SubscriptionUriFactory {
    /// Create a factory with no builders
    #[must_use]
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Create a factory with builders for every protocol except AnyTLS
    #[must_use]
    pub fn with_default_builders() -> Self {
        let mut factory = Self::new();
        factory.register(Arc::new(ShadowsocksUriBuilder));
        factory.register(Arc::new(TrojanUriBuilder));
        factory.register(Arc::new(VlessUriBuilder));
        factory.register(Arc::new(VmessUriBuilder));
        factory.register(Arc::new(Hysteria2UriBuilder));
        factory.register(Arc::new(TuicUriBuilder));
        factory
    }

    /// Shared factory with the default builders
    #[must_use]
    pub fn global() -> &'static Self {
        &DEFAULT_FACTORY
    }

    /// Register a builder, returning the one it replaces
    pub fn register(&mut self, builder: Arc<dyn UriBuilder>) -> Option<Arc<dyn UriBuilder>> {
        self.builders.insert(builder.protocol(), builder)
    }

    /// Check if a builder is registered for `protocol`
    #[must_use]
    pub fn supports(&self, protocol: Protocol) -> bool {
        self.builders.contains_key(&protocol)
    }

    /// Protocols with a registered builder
    #[must_use]
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut protocols: Vec<_> = self.builders.keys().copied().collect();
        protocols.sort();
        protocols
    }

    /// Build a URI for `protocol`
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::UnsupportedProtocol` if no builder is
    /// registered, or whatever the builder reports.
    pub fn build(
        &self,
        protocol: Protocol,
        request: &UriRequest<'_>,
    ) -> Result<String, SubscriptionError> {
        let builder = self
            .builders
            .get(&protocol)
            .ok_or(SubscriptionError::UnsupportedProtocol(protocol))?;
        trace!(%protocol, endpoint = %request.endpoint, "building subscription URI");
        builder.build(request)
    }
}

impl Default for SubscriptionUriFactory {
    fn default() -> Self {
        Self::with_default_builders()
    }
}

impl fmt::Debug for SubscriptionUriFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionUriFactory")
            .field("protocols", &self.protocols())
            .finish()
    }
}
