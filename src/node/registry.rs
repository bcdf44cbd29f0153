//! In-memory node registry
//!
//! Holds live aggregates for lookup by handle, sid or API token. Each entry
//! is an `Arc<Node>`, so callers mutate nodes through the node's own lock
//! while the registry only guards membership.
//!
//! Token lookups go through a hash index. Rotate tokens with
//! [`NodeRegistry::rotate_api_token`], or call
//! [`NodeRegistry::reindex_token`] after rotating on the node directly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::token::hash_token;
use super::Node;
use crate::config::NodePolicy;
use crate::error::RepositoryError;

/// Opaque registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// Raw handle value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Manages live node aggregates
pub struct NodeRegistry {
    nodes: DashMap<NodeHandle, Arc<Node>>,
    by_sid: DashMap<String, NodeHandle>,
    by_token_hash: DashMap<String, NodeHandle>,
    next_handle: AtomicU64,
}

impl NodeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            by_sid: DashMap::new(),
            by_token_hash: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Add a node
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DuplicateSid` if a node with the same sid
    /// is already registered.
    pub fn insert(&self, node: impl Into<Arc<Node>>) -> Result<NodeHandle, RepositoryError> {
        let node = node.into();
        match self.by_sid.entry(node.sid().to_string()) {
            Entry::Occupied(e) => Err(RepositoryError::DuplicateSid(e.key().clone())),
            Entry::Vacant(e) => {
                let handle = NodeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
                info!(node = %node.sid(), %handle, "registering node");
                self.by_token_hash.insert(node.api_token_hash(), handle);
                self.nodes.insert(handle, node);
                e.insert(handle);
                Ok(handle)
            }
        }
    }

    /// Get a node by handle
    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<Arc<Node>> {
        self.nodes.get(&handle).map(|r| Arc::clone(r.value()))
    }

    /// Remove a node by handle
    pub fn remove(&self, handle: NodeHandle) -> Option<Arc<Node>> {
        let (_, node) = self.nodes.remove(&handle)?;
        self.by_sid.remove(node.sid());
        self.by_token_hash.retain(|_, h| *h != handle);
        info!(node = %node.sid(), %handle, "removed node");
        Some(node)
    }

    /// Find a node by its external id
    #[must_use]
    pub fn find_by_sid(&self, sid: &str) -> Option<Arc<Node>> {
        let handle = *self.by_sid.get(sid)?;
        self.get(handle)
    }

    /// Find the node a presented API token belongs to
    ///
    /// Expired tokens do not match.
    #[must_use]
    pub fn find_by_token(&self, plaintext: &str) -> Option<Arc<Node>> {
        let handle = *self.by_token_hash.get(&hash_token(plaintext))?;
        let node = self.get(handle)?;

        // the node may have rotated since it was indexed
        if node.verify_api_token(plaintext) {
            Some(node)
        } else {
            debug!(node = %node.sid(), %handle, "token rejected by node");
            None
        }
    }

    /// Rotate a node's API token and index the new one
    ///
    /// Returns the new plaintext, or `None` for an unknown handle.
    pub fn rotate_api_token(&self, handle: NodeHandle) -> Option<String> {
        let node = self.get(handle)?;
        let plaintext = node.rotate_api_token();
        self.reindex_token(handle);
        Some(plaintext)
    }

    /// Re-read a node's current token hash into the index
    ///
    /// Returns `false` for an unknown handle.
    pub fn reindex_token(&self, handle: NodeHandle) -> bool {
        let Some(node) = self.get(handle) else {
            return false;
        };
        self.by_token_hash.retain(|_, h| *h != handle);
        self.by_token_hash.insert(node.api_token_hash(), handle);
        true
    }

    /// Nodes currently serving subscribers
    pub fn available(&self) -> Vec<Arc<Node>> {
        self.nodes
            .iter()
            .filter(|r| r.value().is_available())
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// Nodes whose agent reported within the policy's online window
    pub fn online(&self, policy: &NodePolicy) -> Vec<Arc<Node>> {
        self.nodes
            .iter()
            .filter(|r| r.value().is_online_with(policy))
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// All registered nodes
    pub fn all(&self) -> Vec<Arc<Node>> {
        self.nodes.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Check if a handle is registered
    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    /// Get the number of registered nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no nodes are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("len", &self.len())
            .finish()
    }
}
