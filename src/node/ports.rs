//! Collaborators the node aggregate consumes
//!
//! The crate ships no storage backend. [`NodeRepository`] describes what a
//! backend must provide; [`IdGenerator`] supplies external identifiers at
//! construction time.

use async_trait::async_trait;

use super::{Node, NodeStatus};
use crate::error::RepositoryError;
use crate::protocol::Protocol;

/// Source of external (public) node identifiers
///
/// Any `Fn() -> String` closure is an `IdGenerator`.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Random UUID v4 identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Filter for [`NodeRepository::list`]
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub status: Option<NodeStatus>,
    pub protocol: Option<Protocol>,
    pub group_id: Option<u64>,
    pub owner_id: Option<u64>,
}

impl NodeFilter {
    /// Check whether `node` passes the filter
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        self.status.map_or(true, |s| node.status() == s)
            && self.protocol.map_or(true, |p| node.protocol() == p)
            && self.group_id.map_or(true, |g| node.group_ids().contains(&g))
            && self.owner_id.map_or(true, |o| node.owner_id() == Some(o))
    }
}

/// Persistence port for node aggregates
///
/// `update` must compare-and-swap on [`Node::original_version`]: the write
/// succeeds only if the stored version still equals it, and stores
/// [`Node::version`]. Callers then invoke [`Node::mark_persisted`].
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Load a node by internal id
    async fn get_by_id(&self, id: u64) -> Result<Option<Node>, RepositoryError>;

    /// Load a node by external id
    async fn get_by_sid(&self, sid: &str) -> Result<Option<Node>, RepositoryError>;

    /// Load a node by the SHA-256 hex digest of its API token
    async fn get_by_token_hash(&self, hash: &str) -> Result<Option<Node>, RepositoryError>;

    /// List nodes passing `filter`
    async fn list(&self, filter: &NodeFilter) -> Result<Vec<Node>, RepositoryError>;

    /// Insert a new node and return its internal id
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DuplicateSid` if the sid is taken.
    async fn create(&self, node: &Node) -> Result<u64, RepositoryError>;

    /// Store a modified node
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` when the stored version
    /// differs from the node's original version.
    async fn update(&self, node: &Node) -> Result<(), RepositoryError>;

    /// Delete a node by internal id
    async fn delete(&self, id: u64) -> Result<(), RepositoryError>;
}
