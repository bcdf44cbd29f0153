//! Error types for node-core
//!
//! This module defines the error hierarchy for the node aggregate and its
//! value objects. Errors are grouped by the kind of failure:
//!
//! - [`ValidationError`]: malformed input rejected before anything changes
//! - [`TransitionError`]: illegal lifecycle transition
//! - [`SubscriptionError`]: subscription URI generation failures
//! - [`ConfigError`]: configuration file and environment errors
//! - [`RepositoryError`]: persistence port failures
//!
//! Credential verification never produces an error; it is a plain `bool`.

use std::io;

use thiserror::Error;

use crate::node::NodeStatus;
use crate::protocol::Protocol;

/// Top-level error type for node-core
#[derive(Debug, Error)]
pub enum NodeError {
    /// Input validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Illegal lifecycle transition
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// A protocol-scoped config was applied to a node of another protocol
    #[error("Protocol mismatch: node speaks {expected}, config is for {actual}")]
    ProtocolMismatch { expected: Protocol, actual: Protocol },

    /// The node's identity was already assigned
    #[error("Node identity already assigned: {existing}")]
    IdentityAlreadyAssigned { existing: u64 },

    /// Subscription URI generation failed
    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl NodeError {
    /// Create a protocol mismatch error
    pub fn protocol_mismatch(expected: Protocol, actual: Protocol) -> Self {
        Self::ProtocolMismatch { expected, actual }
    }

    /// Check if this error was caused by caller input rather than node state
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Validation errors for node fields and value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Node name is empty
    #[error("node name cannot be empty")]
    EmptyName,

    /// The id generator produced an empty identifier
    #[error("generated node identifier is empty")]
    EmptyIdentifier,

    /// Port is zero
    #[error("{field} cannot be 0")]
    ZeroPort { field: &'static str },

    /// Server address is neither an IP nor a domain
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// Unknown protocol tag
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Unknown Shadowsocks cipher
    #[error("invalid Shadowsocks encryption method: {0}")]
    InvalidMethod(String),

    /// Shadowsocks password outside the accepted length range
    #[error("invalid Shadowsocks password: {0}")]
    InvalidPassword(String),

    /// Unknown plugin or plugin mode
    #[error("invalid plugin configuration: {0}")]
    InvalidPlugin(String),

    /// Unknown uTLS fingerprint
    #[error("unknown TLS fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Maintenance requires a reason
    #[error("maintenance reason cannot be empty")]
    EmptyMaintenanceReason,

    /// Protocol-specific configuration is invalid
    #[error("invalid {protocol} configuration: {reason}")]
    InvalidProtocolConfig { protocol: Protocol, reason: String },

    /// The protocol tag and the supplied config disagree
    #[error("protocol {protocol} requires a {protocol} configuration, got {config}")]
    ConfigMismatch { protocol: Protocol, config: Protocol },

    /// Route override is structurally invalid
    #[error("invalid route configuration: {0}")]
    InvalidRoute(String),

    /// DNS override is structurally invalid
    #[error("invalid DNS configuration: {0}")]
    InvalidDns(String),

    /// Persisted record failed structural checks
    #[error("invalid node record: {0}")]
    InvalidRecord(String),
}

impl ValidationError {
    /// Create a protocol config error
    pub fn protocol_config(protocol: Protocol, reason: impl Into<String>) -> Self {
        Self::InvalidProtocolConfig {
            protocol,
            reason: reason.into(),
        }
    }

    /// Create a zero-port error for the named field
    pub const fn zero_port(field: &'static str) -> Self {
        Self::ZeroPort { field }
    }
}

/// Illegal lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition node from {from} to {to}")]
pub struct TransitionError {
    /// Current status
    pub from: NodeStatus,
    /// Requested status
    pub to: NodeStatus,
}

/// Subscription URI generation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// No URI builder is registered for the protocol
    #[error("no subscription URI builder registered for {0}")]
    UnsupportedProtocol(Protocol),

    /// The builder received a config for another protocol
    #[error("{builder} builder received a {config} configuration")]
    ConfigMismatch { builder: Protocol, config: Protocol },

    /// The node has no config for its protocol
    #[error("{0} configuration is missing")]
    MissingConfig(Protocol),

    /// The resolved endpoint has no usable host
    #[error("node has no server address and no reported public IP")]
    MissingAddress,

    /// Payload encoding failed
    #[error("failed to encode subscription payload: {0}")]
    Encode(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),

    /// Logging subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Errors reported by node repositories
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No node with the given id
    #[error("node {id} not found")]
    NotFound { id: u64 },

    /// The stored version no longer matches the loaded version
    #[error("version conflict on node {id}: expected {expected}, found {actual}")]
    VersionConflict { id: u64, expected: u64, actual: u64 },

    /// A node with the same sid already exists
    #[error("duplicate node sid: {0}")]
    DuplicateSid(String),

    /// The node has no identity yet
    #[error("node {sid} has not been persisted")]
    Unpersisted { sid: String },

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    /// Check if this is an optimistic-locking conflict
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Result alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;
