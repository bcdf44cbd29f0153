//! Node aggregate root
//!
//! A [`Node`] owns its configuration, lifecycle status and credential. All
//! mutable state sits behind one `parking_lot::RwLock`; immutable fields
//! (sid, protocol, creation time, identity once assigned) are read without
//! locking.
//!
//! # Mutation contract
//!
//! Every setter validates its input, compares it with the current value and
//! returns `false` without touching anything when they are equal. Otherwise
//! it applies the change, advances `updated_at` and increments `version`.
//! All of this happens under the write guard, so readers never observe a
//! half-applied update.
//!
//! # Optimistic locking
//!
//! `version` counts in-memory changes. `original_version` is the version the
//! node had when it was loaded (or last written); repositories compare-and-swap
//! on it and the caller then invokes [`Node::mark_persisted`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::address::ServerAddress;
use super::metadata::{AgentReport, AgentTelemetry, NodeMetadata};
use super::ports::IdGenerator;
use super::routing::{DnsConfig, RouteConfig};
use super::status::NodeStatus;
use super::token::{NodeToken, RandomTokenIssuer, TokenIssuer};
use crate::config::NodePolicy;
use crate::error::{NodeError, NodeResult, SubscriptionError, TransitionError, ValidationError};
use crate::protocol::{Protocol, ProtocolConfig};
use crate::shadowsocks::{EncryptionConfig, PluginConfig};
use crate::subscription::{Endpoint, SubscriptionUriFactory, UriRequest};

/// Input for [`Node::create`]
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub name: String,
    /// IP literal or domain; may be empty when the agent reports its IP
    pub server_address: String,
    pub agent_port: u16,
    pub subscription_port: Option<u16>,
    pub protocol: Protocol,
    pub config: ProtocolConfig,
    pub metadata: NodeMetadata,
    pub group_ids: BTreeSet<u64>,
    pub owner_id: Option<u64>,
    pub sort_order: i32,
    pub route: Option<RouteConfig>,
    pub dns: Option<DnsConfig>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NodeDraft {
    /// Create a draft; the protocol is taken from `config`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        server_address: impl Into<String>,
        agent_port: u16,
        config: impl Into<ProtocolConfig>,
    ) -> Self {
        let config = config.into();
        Self {
            name: name.into(),
            server_address: server_address.into(),
            agent_port,
            subscription_port: None,
            protocol: config.protocol(),
            config,
            metadata: NodeMetadata::default(),
            group_ids: BTreeSet::new(),
            owner_id: None,
            sort_order: 0,
            route: None,
            dns: None,
            expires_at: None,
        }
    }

    /// Override the protocol tag (e.g. one parsed from an API request)
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    #[must_use]
    pub fn with_subscription_port(mut self, port: u16) -> Self {
        self.subscription_port = Some(port);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_groups(mut self, group_ids: impl IntoIterator<Item = u64>) -> Self {
        self.group_ids = group_ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner_id: u64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn with_route(mut self, route: RouteConfig) -> Self {
        self.route = Some(route);
        self
    }

    #[must_use]
    pub fn with_dns(mut self, dns: DnsConfig) -> Self {
        self.dns = Some(dns);
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Persisted shape of a node
///
/// The plaintext API token is never part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub sid: String,
    pub name: String,
    #[serde(default)]
    pub server_address: ServerAddress,
    pub agent_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_port: Option<u16>,
    pub protocol: Protocol,
    pub config: ProtocolConfig,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_reason: Option<String>,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub group_ids: BTreeSet<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<u64>,
    #[serde(default)]
    pub sort_order: i32,
    pub token_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<AgentTelemetry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

struct NodeState {
    name: String,
    server_address: ServerAddress,
    agent_port: u16,
    subscription_port: Option<u16>,
    config: ProtocolConfig,
    status: NodeStatus,
    maintenance_reason: Option<String>,
    metadata: NodeMetadata,
    group_ids: BTreeSet<u64>,
    owner_id: Option<u64>,
    sort_order: i32,
    token: NodeToken,
    plain_token: Option<String>,
    route: Option<RouteConfig>,
    dns: Option<DnsConfig>,
    telemetry: Option<AgentTelemetry>,
    expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    version: u64,
    original_version: u64,
}

impl NodeState {
    fn effective_server_address(&self) -> String {
        if !self.server_address.is_empty() {
            return self.server_address.as_str().to_string();
        }
        self.telemetry
            .as_ref()
            .and_then(|t| t.report.public_ipv4)
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }

    fn effective_subscription_port(&self) -> u16 {
        self.subscription_port.unwrap_or(self.agent_port)
    }
}

/// Replace `slot` with `value` if they differ
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn trimmed_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

fn check_agent_port(port: u16) -> Result<u16, ValidationError> {
    if port == 0 {
        Err(ValidationError::zero_port("agent port"))
    } else {
        Ok(port)
    }
}

fn check_subscription_port(port: Option<u16>) -> Result<Option<u16>, ValidationError> {
    if port == Some(0) {
        Err(ValidationError::zero_port("subscription port"))
    } else {
        Ok(port)
    }
}

fn validate_overrides(
    route: Option<&RouteConfig>,
    dns: Option<&DnsConfig>,
) -> Result<(), ValidationError> {
    if let Some(route) = route {
        route.validate()?;
    }
    if let Some(dns) = dns {
        dns.validate()?;
    }
    Ok(())
}

/// A proxy relay endpoint
pub struct Node {
    id: OnceCell<u64>,
    sid: String,
    protocol: Protocol,
    created_at: DateTime<Utc>,
    state: RwLock<NodeState>,
}

impl Node {
    /// Create a node from a draft
    ///
    /// The node starts inactive at version 1 with a freshly issued API
    /// token; the plaintext is available from [`plain_api_token`](Self::plain_api_token)
    /// until cleared.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Validation` if any field is invalid. Nothing is
    /// created in that case.
    pub fn create(draft: NodeDraft, ids: &dyn IdGenerator) -> NodeResult<Self> {
        Self::create_with_issuer(draft, ids, &RandomTokenIssuer)
    }

    /// Create a node with a custom token issuer
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn create_with_issuer(
        draft: NodeDraft,
        ids: &dyn IdGenerator,
        issuer: &dyn TokenIssuer,
    ) -> NodeResult<Self> {
        let name = trimmed_name(&draft.name)?;
        let agent_port = check_agent_port(draft.agent_port)?;
        let subscription_port = check_subscription_port(draft.subscription_port)?;
        let server_address = ServerAddress::parse(&draft.server_address)?;
        draft.config.ensure_protocol(draft.protocol)?;
        draft.config.validate()?;
        validate_overrides(draft.route.as_ref(), draft.dns.as_ref())?;

        let sid = ids.generate();
        if sid.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier.into());
        }

        let (plaintext, token) = issuer.issue();
        let now = Utc::now();

        info!(node = %sid, protocol = %draft.protocol, "node created");

        Ok(Self {
            id: OnceCell::new(),
            sid,
            protocol: draft.protocol,
            created_at: now,
            state: RwLock::new(NodeState {
                name,
                server_address,
                agent_port,
                subscription_port,
                config: draft.config,
                status: NodeStatus::Inactive,
                maintenance_reason: None,
                metadata: draft.metadata,
                group_ids: draft.group_ids,
                owner_id: draft.owner_id,
                sort_order: draft.sort_order,
                token,
                plain_token: Some(plaintext),
                route: draft.route,
                dns: draft.dns,
                telemetry: None,
                expires_at: draft.expires_at,
                updated_at: now,
                version: 1,
                original_version: 1,
            }),
        })
    }

    /// Rebuild a node from its persisted record
    ///
    /// The checks here are structural only. Value objects inside the record
    /// (`ServerAddress`, `EncryptionConfig`, `PluginConfig`) validate
    /// themselves again while the record is deserialized, so a stored value
    /// that no longer passes today's rules fails to load.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Validation` for a record that cannot describe a
    /// node (empty sid, zero version or agent port, config of another
    /// protocol, inconsistent maintenance reason, malformed token hash).
    pub fn reconstruct(record: NodeRecord) -> NodeResult<Self> {
        if record.sid.trim().is_empty() {
            return Err(ValidationError::InvalidRecord("sid is empty".into()).into());
        }
        if record.version == 0 {
            return Err(ValidationError::InvalidRecord("version must be at least 1".into()).into());
        }
        if record.agent_port == 0 {
            return Err(ValidationError::InvalidRecord("agent port is 0".into()).into());
        }
        record.config.ensure_protocol(record.protocol)?;

        match (record.status, record.maintenance_reason.as_deref()) {
            (NodeStatus::Maintenance, Some(reason)) if !reason.trim().is_empty() => {}
            (NodeStatus::Maintenance, _) => {
                return Err(ValidationError::InvalidRecord(
                    "maintenance status without a reason".into(),
                )
                .into());
            }
            (_, Some(_)) => {
                return Err(ValidationError::InvalidRecord(
                    "maintenance reason set outside maintenance".into(),
                )
                .into());
            }
            _ => {}
        }

        let token = NodeToken::from_hash(record.token_hash, record.token_expires_at)?;
        let id = record.id.map_or_else(OnceCell::new, OnceCell::from);

        Ok(Self {
            id,
            sid: record.sid,
            protocol: record.protocol,
            created_at: record.created_at,
            state: RwLock::new(NodeState {
                name: record.name,
                server_address: record.server_address,
                agent_port: record.agent_port,
                subscription_port: record.subscription_port,
                config: record.config,
                status: record.status,
                maintenance_reason: record.maintenance_reason,
                metadata: record.metadata,
                group_ids: record.group_ids,
                owner_id: record.owner_id,
                sort_order: record.sort_order,
                token,
                plain_token: None,
                route: record.route,
                dns: record.dns,
                telemetry: record.telemetry,
                expires_at: record.expires_at,
                updated_at: record.updated_at,
                version: record.version,
                original_version: record.version,
            }),
        })
    }

    /// Consistent copy of the node's persistent state
    #[must_use]
    pub fn snapshot(&self) -> NodeRecord {
        let s = self.state.read();
        NodeRecord {
            id: self.id(),
            sid: self.sid.clone(),
            name: s.name.clone(),
            server_address: s.server_address.clone(),
            agent_port: s.agent_port,
            subscription_port: s.subscription_port,
            protocol: self.protocol,
            config: s.config.clone(),
            status: s.status,
            maintenance_reason: s.maintenance_reason.clone(),
            metadata: s.metadata.clone(),
            group_ids: s.group_ids.clone(),
            owner_id: s.owner_id,
            sort_order: s.sort_order,
            token_hash: s.token.hash().to_string(),
            token_expires_at: s.token.expires_at(),
            route: s.route.clone(),
            dns: s.dns.clone(),
            telemetry: s.telemetry.clone(),
            expires_at: s.expires_at,
            created_at: self.created_at,
            updated_at: s.updated_at,
            version: s.version,
        }
    }

    // ========================================================================
    // Mutation plumbing
    // ========================================================================

    fn touch(&self, state: &mut NodeState, op: &'static str) {
        let now = Utc::now();
        if now > state.updated_at {
            state.updated_at = now;
        }
        state.version += 1;
        debug!(node = %self.sid, op, version = state.version, "node updated");
    }

    /// Run a fallible change under the write guard, bumping on change
    fn mutate<F>(&self, op: &'static str, f: F) -> NodeResult<bool>
    where
        F: FnOnce(&mut NodeState) -> NodeResult<bool>,
    {
        let mut state = self.state.write();
        let changed = f(&mut *state)?;
        if changed {
            self.touch(&mut state, op);
        }
        Ok(changed)
    }

    /// Run an infallible change under the write guard, bumping on change
    fn apply<F>(&self, op: &'static str, f: F) -> bool
    where
        F: FnOnce(&mut NodeState) -> bool,
    {
        let mut state = self.state.write();
        let changed = f(&mut *state);
        if changed {
            self.touch(&mut state, op);
        }
        changed
    }

    fn shadowsocks_mut<'a>(
        &self,
        state: &'a mut NodeState,
    ) -> NodeResult<&'a mut crate::shadowsocks::ShadowsocksConfig> {
        match state.config {
            ProtocolConfig::Shadowsocks(ref mut ss) => Ok(ss),
            _ => Err(NodeError::protocol_mismatch(
                self.protocol,
                Protocol::Shadowsocks,
            )),
        }
    }

    // ========================================================================
    // Setters
    // ========================================================================

    /// Rename the node
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyName` for a blank name.
    pub fn update_name(&self, name: &str) -> NodeResult<bool> {
        self.mutate("update_name", |s| {
            let name = trimmed_name(name)?;
            Ok(replace(&mut s.name, name))
        })
    }

    /// Change the server address (empty clears it)
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidAddress` if the value is neither an
    /// IP literal nor a domain.
    pub fn update_server_address(&self, address: &str) -> NodeResult<bool> {
        self.mutate("update_server_address", |s| {
            let address = ServerAddress::parse(address)?;
            Ok(replace(&mut s.server_address, address))
        })
    }

    /// Change the agent port
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ZeroPort` for port 0.
    pub fn update_agent_port(&self, port: u16) -> NodeResult<bool> {
        self.mutate("update_agent_port", |s| {
            let port = check_agent_port(port)?;
            Ok(replace(&mut s.agent_port, port))
        })
    }

    /// Change or clear the subscription port
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ZeroPort` for port 0.
    pub fn update_subscription_port(&self, port: Option<u16>) -> NodeResult<bool> {
        self.mutate("update_subscription_port", |s| {
            let port = check_subscription_port(port)?;
            Ok(replace(&mut s.subscription_port, port))
        })
    }

    /// Replace the protocol configuration
    ///
    /// # Errors
    ///
    /// Returns `NodeError::ProtocolMismatch` if `config` belongs to another
    /// protocol, or `NodeError::Validation` if it is invalid.
    pub fn update_protocol_config(&self, config: ProtocolConfig) -> NodeResult<bool> {
        self.mutate("update_protocol_config", |s| {
            if config.protocol() != self.protocol {
                return Err(NodeError::protocol_mismatch(self.protocol, config.protocol()));
            }
            config.validate()?;
            Ok(replace(&mut s.config, config))
        })
    }

    /// Replace the Shadowsocks cipher and password
    ///
    /// # Errors
    ///
    /// Returns `NodeError::ProtocolMismatch` on a non-Shadowsocks node.
    pub fn update_encryption(&self, encryption: EncryptionConfig) -> NodeResult<bool> {
        self.mutate("update_encryption", |s| {
            encryption.validate()?;
            let ss = self.shadowsocks_mut(s)?;
            Ok(replace(&mut ss.encryption, encryption))
        })
    }

    /// Replace or remove the Shadowsocks plugin
    ///
    /// # Errors
    ///
    /// Returns `NodeError::ProtocolMismatch` on a non-Shadowsocks node.
    pub fn update_plugin(&self, plugin: Option<PluginConfig>) -> NodeResult<bool> {
        self.mutate("update_plugin", |s| {
            if let Some(ref plugin) = plugin {
                plugin.validate()?;
            }
            let ss = self.shadowsocks_mut(s)?;
            Ok(replace(&mut ss.plugin, plugin))
        })
    }

    /// Replace descriptive metadata
    pub fn update_metadata(&self, metadata: NodeMetadata) -> bool {
        self.apply("update_metadata", |s| replace(&mut s.metadata, metadata))
    }

    /// Change the display order
    pub fn update_sort_order(&self, sort_order: i32) -> bool {
        self.apply("update_sort_order", |s| replace(&mut s.sort_order, sort_order))
    }

    /// Replace group membership
    pub fn set_group_ids(&self, group_ids: impl IntoIterator<Item = u64>) -> bool {
        let group_ids: BTreeSet<u64> = group_ids.into_iter().collect();
        self.apply("set_group_ids", |s| replace(&mut s.group_ids, group_ids))
    }

    /// Add the node to a group
    pub fn add_to_group(&self, group_id: u64) -> bool {
        self.apply("add_to_group", |s| s.group_ids.insert(group_id))
    }

    /// Remove the node from a group
    pub fn remove_from_group(&self, group_id: u64) -> bool {
        self.apply("remove_from_group", |s| s.group_ids.remove(&group_id))
    }

    /// Change or clear the owning user
    pub fn set_owner(&self, owner_id: Option<u64>) -> bool {
        self.apply("set_owner", |s| replace(&mut s.owner_id, owner_id))
    }

    /// Replace or clear the route override
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidRoute` for a malformed override.
    pub fn update_route_config(&self, route: Option<RouteConfig>) -> NodeResult<bool> {
        self.mutate("update_route_config", |s| {
            validate_overrides(route.as_ref(), None)?;
            Ok(replace(&mut s.route, route))
        })
    }

    /// Replace or clear the DNS override
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidDns` for a malformed override.
    pub fn update_dns_config(&self, dns: Option<DnsConfig>) -> NodeResult<bool> {
        self.mutate("update_dns_config", |s| {
            validate_overrides(None, dns.as_ref())?;
            Ok(replace(&mut s.dns, dns))
        })
    }

    /// Change or clear the node's expiry
    pub fn set_expires_at(&self, expires_at: Option<DateTime<Utc>>) -> bool {
        self.apply("set_expires_at", |s| replace(&mut s.expires_at, expires_at))
    }

    /// Record an agent heartbeat received at `now`
    ///
    /// A report older than the stored one is ignored and returns `false`.
    pub fn record_agent_report(&self, report: AgentReport, now: DateTime<Utc>) -> bool {
        self.apply("record_agent_report", |s| {
            if let Some(last) = &s.telemetry {
                if now < last.last_seen_at {
                    debug!(
                        node = %self.sid,
                        %now,
                        last_seen_at = %last.last_seen_at,
                        "ignoring stale agent report"
                    );
                    return false;
                }
            }
            let telemetry = AgentTelemetry {
                last_seen_at: now,
                report,
            };
            replace(&mut s.telemetry, Some(telemetry))
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn transition(&self, op: &'static str, target: NodeStatus) -> NodeResult<bool> {
        self.mutate(op, |s| {
            if s.status == target {
                return Ok(false);
            }
            s.status.validate_transition(target)?;
            let from = s.status;
            s.status = target;
            s.maintenance_reason = None;
            info!(node = %self.sid, %from, to = %target, "node status changed");
            Ok(true)
        })
    }

    /// Put the node into service
    ///
    /// No-op when already active.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Transition` for an illegal edge.
    pub fn activate(&self) -> NodeResult<bool> {
        self.transition("activate", NodeStatus::Active)
    }

    /// Withdraw the node from service
    ///
    /// No-op when already inactive. Leaving maintenance clears the reason.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Transition` for an illegal edge.
    pub fn deactivate(&self) -> NodeResult<bool> {
        self.transition("deactivate", NodeStatus::Inactive)
    }

    /// Put the node into maintenance
    ///
    /// Status and reason change together. Already in maintenance: the same
    /// reason is a no-op, a different reason replaces it.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyMaintenanceReason` for a blank reason in
    /// any state, or `NodeError::Transition` from `inactive`.
    pub fn enter_maintenance(&self, reason: &str) -> NodeResult<bool> {
        self.mutate("enter_maintenance", |s| {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(ValidationError::EmptyMaintenanceReason.into());
            }

            if s.status == NodeStatus::Maintenance {
                return Ok(replace(&mut s.maintenance_reason, Some(reason.to_string())));
            }

            s.status.validate_transition(NodeStatus::Maintenance)?;
            let from = s.status;
            s.status = NodeStatus::Maintenance;
            s.maintenance_reason = Some(reason.to_string());
            warn!(node = %self.sid, %from, reason, "node entered maintenance");
            Ok(true)
        })
    }

    /// Return the node from maintenance to service, clearing the reason
    ///
    /// Only takes the maintenance to active edge; no-op when already active.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Transition` when the node is inactive.
    pub fn exit_maintenance(&self) -> NodeResult<bool> {
        self.mutate("exit_maintenance", |s| match s.status {
            NodeStatus::Active => Ok(false),
            NodeStatus::Maintenance => {
                s.status = NodeStatus::Active;
                s.maintenance_reason = None;
                info!(node = %self.sid, "node left maintenance");
                Ok(true)
            }
            from @ NodeStatus::Inactive => Err(TransitionError {
                from,
                to: NodeStatus::Active,
            }
            .into()),
        })
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Issue a fresh API token, invalidating the previous one
    ///
    /// Returns the plaintext, which is also kept until
    /// [`clear_plain_api_token`](Self::clear_plain_api_token). The new token
    /// has no expiry.
    pub fn rotate_api_token(&self) -> String {
        self.rotate_api_token_with(&RandomTokenIssuer)
    }

    /// Issue a fresh API token from `issuer`
    pub fn rotate_api_token_with(&self, issuer: &dyn TokenIssuer) -> String {
        let (plaintext, token) = issuer.issue();
        let mut state = self.state.write();
        state.token = token;
        state.plain_token = Some(plaintext.clone());
        self.touch(&mut state, "rotate_api_token");
        info!(node = %self.sid, "API token rotated");
        plaintext
    }

    /// Set or clear the token expiry
    pub fn set_api_token_expiry(&self, expires_at: Option<DateTime<Utc>>) -> bool {
        self.apply("set_api_token_expiry", |s| {
            let token = match expires_at {
                Some(at) => s.token.with_expiry(at),
                None => s.token.without_expiry(),
            };
            replace(&mut s.token, token)
        })
    }

    /// Drop the transient plaintext token
    ///
    /// Does not change the version: the plaintext is never persisted.
    /// Returns whether a plaintext was held.
    pub fn clear_plain_api_token(&self) -> bool {
        self.state.write().plain_token.take().is_some()
    }

    /// Plaintext token, if still held since issue/rotation
    #[must_use]
    pub fn plain_api_token(&self) -> Option<String> {
        self.state.read().plain_token.clone()
    }

    /// Verify a presented token against the current time
    #[must_use]
    pub fn verify_api_token(&self, plaintext: &str) -> bool {
        self.verify_api_token_at(plaintext, Utc::now())
    }

    /// Verify a presented token at `now`
    #[must_use]
    pub fn verify_api_token_at(&self, plaintext: &str, now: DateTime<Utc>) -> bool {
        self.state.read().token.verify_at(plaintext, now)
    }

    /// Stored token digest
    #[must_use]
    pub fn api_token_hash(&self) -> String {
        self.state.read().token.hash().to_string()
    }

    /// Token expiry, if any
    #[must_use]
    pub fn api_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().token.expires_at()
    }

    // ========================================================================
    // Identity and persistence
    // ========================================================================

    /// Internal id, once persisted
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.id.get().copied()
    }

    /// Assign the internal id handed out by storage
    ///
    /// # Errors
    ///
    /// Returns `NodeError::IdentityAlreadyAssigned` if an id is already set.
    pub fn assign_id(&self, id: u64) -> NodeResult<()> {
        self.id.set(id).map_err(|_| NodeError::IdentityAlreadyAssigned {
            existing: self.id.get().copied().unwrap_or(id),
        })
    }

    /// Record a successful write of the current version
    pub fn mark_persisted(&self) {
        let mut state = self.state.write();
        state.original_version = state.version;
    }

    /// In-memory version
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Version at load time or last successful write
    #[must_use]
    pub fn original_version(&self) -> u64 {
        self.state.read().original_version
    }

    /// Check if there are changes not yet written
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let s = self.state.read();
        s.version != s.original_version
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn sid(&self) -> &str {
        &self.sid
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    #[must_use]
    pub fn server_address(&self) -> ServerAddress {
        self.state.read().server_address.clone()
    }

    #[must_use]
    pub fn agent_port(&self) -> u16 {
        self.state.read().agent_port
    }

    #[must_use]
    pub fn subscription_port(&self) -> Option<u16> {
        self.state.read().subscription_port
    }

    #[must_use]
    pub fn config(&self) -> ProtocolConfig {
        self.state.read().config.clone()
    }

    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.state.read().status
    }

    #[must_use]
    pub fn maintenance_reason(&self) -> Option<String> {
        self.state.read().maintenance_reason.clone()
    }

    /// Status and maintenance reason read together
    #[must_use]
    pub fn status_with_reason(&self) -> (NodeStatus, Option<String>) {
        let s = self.state.read();
        (s.status, s.maintenance_reason.clone())
    }

    #[must_use]
    pub fn metadata(&self) -> NodeMetadata {
        self.state.read().metadata.clone()
    }

    #[must_use]
    pub fn group_ids(&self) -> BTreeSet<u64> {
        self.state.read().group_ids.clone()
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<u64> {
        self.state.read().owner_id
    }

    #[must_use]
    pub fn sort_order(&self) -> i32 {
        self.state.read().sort_order
    }

    #[must_use]
    pub fn route_config(&self) -> Option<RouteConfig> {
        self.state.read().route.clone()
    }

    #[must_use]
    pub fn dns_config(&self) -> Option<DnsConfig> {
        self.state.read().dns.clone()
    }

    #[must_use]
    pub fn telemetry(&self) -> Option<AgentTelemetry> {
        self.state.read().telemetry.clone()
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().expires_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.state.read().updated_at
    }

    // ========================================================================
    // Derived queries
    // ========================================================================

    /// Check if the node serves subscribers
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status() == NodeStatus::Active
    }

    /// Check if the agent reported within the default window (5 minutes)
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.is_online_with(&NodePolicy::default())
    }

    /// Check if the agent reported within `window` before `now`
    #[must_use]
    pub fn is_online_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.state
            .read()
            .telemetry
            .as_ref()
            .is_some_and(|t| now.signed_duration_since(t.last_seen_at) <= window)
    }

    /// Check online status using a policy's window
    #[must_use]
    pub fn is_online_with(&self, policy: &NodePolicy) -> bool {
        self.is_online_at(Utc::now(), policy.online_window())
    }

    /// Check if the node has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if the node has expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }

    /// Check if the node expires within the default window
    #[must_use]
    pub fn is_expiring_soon(&self) -> bool {
        self.is_expiring_soon_with(&NodePolicy::default())
    }

    /// Check expiring-soon status using a policy's window
    #[must_use]
    pub fn is_expiring_soon_with(&self, policy: &NodePolicy) -> bool {
        self.is_expiring_soon_at(Utc::now(), policy.expiring_soon_window())
    }

    /// Check if the node is not yet expired but expires within `window` of `now`
    #[must_use]
    pub fn is_expiring_soon_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at()
            .is_some_and(|at| now < at && at.signed_duration_since(now) <= window)
    }

    /// Server address, else the agent's public IPv4, else empty
    #[must_use]
    pub fn effective_server_address(&self) -> String {
        self.state.read().effective_server_address()
    }

    /// Subscription port, else the agent port
    #[must_use]
    pub fn effective_subscription_port(&self) -> u16 {
        self.state.read().effective_subscription_port()
    }

    /// Remarks rendered from a policy's template
    #[must_use]
    pub fn subscription_remarks(&self, policy: &NodePolicy) -> String {
        policy.render_remarks(&self.name(), self.protocol)
    }

    // ========================================================================
    // Subscription URIs
    // ========================================================================

    /// Build the share link for a subscriber using the default builders
    ///
    /// `password` is the subscriber's secret (password, UUID or auth string,
    /// depending on protocol); Shadowsocks uses the node's own credentials.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Subscription` if the node has no usable address,
    /// no builder is registered, or encoding fails.
    pub fn generate_subscription_uri(&self, password: &str, remarks: &str) -> NodeResult<String> {
        self.generate_subscription_uri_with(SubscriptionUriFactory::global(), password, remarks)
    }

    /// Build the share link with a specific factory
    ///
    /// # Errors
    ///
    /// Same as [`generate_subscription_uri`](Self::generate_subscription_uri).
    pub fn generate_subscription_uri_with(
        &self,
        factory: &SubscriptionUriFactory,
        password: &str,
        remarks: &str,
    ) -> NodeResult<String> {
        let state = self.state.read();

        let host = state.effective_server_address();
        if host.is_empty() {
            return Err(SubscriptionError::MissingAddress.into());
        }
        let endpoint = Endpoint::new(host, state.effective_subscription_port());

        match self.protocol {
            Protocol::Trojan if state.config.as_trojan().is_none() => {
                return Err(SubscriptionError::MissingConfig(Protocol::Trojan).into());
            }
            Protocol::AnyTls => {
                let config = state
                    .config
                    .as_anytls()
                    .ok_or(SubscriptionError::MissingConfig(Protocol::AnyTls))?;
                return Ok(config.to_subscription_uri(&endpoint, password, remarks));
            }
            _ => {}
        }

        let request = UriRequest {
            config: &state.config,
            endpoint: &endpoint,
            password,
            remarks,
        };
        Ok(factory.build(self.protocol, &request)?)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state.read();
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("sid", &self.sid)
            .field("protocol", &self.protocol)
            .field("name", &s.name)
            .field("status", &s.status)
            .field("version", &s.version)
            .finish_non_exhaustive()
    }
}
