//! Lifecycle and credential scenarios
//!
//! # Test Categories
//!
//! 1. **Transition table**: every ordered status pair through the aggregate
//! 2. **Maintenance**: entering and leaving with reasons
//! 3. **Credentials**: issue, verify, purge, rotate

use std::net::Ipv4Addr;

use base64::Engine;
use chrono::Utc;

use node_core::node::{AgentReport, Node, NodeDraft, NodeStatus};
use node_core::protocol::{TlsOptions, TrojanConfig, VlessConfig, VlessSecurity};
use node_core::shadowsocks::{EncryptionConfig, ShadowsocksConfig};
use node_core::{NodeError, ValidationError};

// ============================================================================
// Test Helpers
// ============================================================================

fn fixed_sid() -> String {
    "6f1c2a9e-node".to_string()
}

fn shadowsocks_node(address: &str) -> Node {
    let encryption = EncryptionConfig::new("AES-256-GCM", "password123").unwrap();
    Node::create(
        NodeDraft::new("Tokyo 01", address, 8388, ShadowsocksConfig::new(encryption)),
        &fixed_sid,
    )
    .unwrap()
}

/// Drive a fresh node into `status`
fn node_in(status: NodeStatus) -> Node {
    let node = shadowsocks_node("1.2.3.4");
    match status {
        NodeStatus::Inactive => {}
        NodeStatus::Active => {
            node.activate().unwrap();
        }
        NodeStatus::Maintenance => {
            node.activate().unwrap();
            node.enter_maintenance("scheduled").unwrap();
        }
    }
    node
}

fn drive(node: &Node, target: NodeStatus) -> Result<bool, NodeError> {
    match target {
        NodeStatus::Inactive => node.deactivate(),
        NodeStatus::Active => node.activate(),
        NodeStatus::Maintenance => node.enter_maintenance("scheduled"),
    }
}

// ============================================================================
// Transition Table Tests
// ============================================================================

#[test]
fn test_transition_table_through_aggregate() {
    for from in NodeStatus::ALL {
        for to in NodeStatus::ALL {
            let node = node_in(from);
            let version = node.version();
            let result = drive(&node, to);

            if from == to {
                // idempotent no-op
                assert!(!result.unwrap(), "{from} -> {to}");
                assert_eq!(node.version(), version);
            } else if from.can_transition_to(to) {
                assert!(result.unwrap(), "{from} -> {to}");
                assert_eq!(node.status(), to);
                assert_eq!(node.version(), version + 1);
            } else {
                assert!(matches!(result, Err(NodeError::Transition(_))), "{from} -> {to}");
                assert_eq!(node.status(), from);
                assert_eq!(node.version(), version);
            }
        }
    }
}

#[test]
fn test_legal_edge_count() {
    let legal = NodeStatus::ALL
        .iter()
        .flat_map(|from| NodeStatus::ALL.iter().map(move |to| (*from, *to)))
        .filter(|(from, to)| from.can_transition_to(*to))
        .count();
    assert_eq!(legal, 5);
    assert!(NodeStatus::Maintenance.can_transition_to(NodeStatus::Inactive));
    assert!(NodeStatus::Maintenance.can_transition_to(NodeStatus::Active));
    assert!(!NodeStatus::Inactive.can_transition_to(NodeStatus::Maintenance));
}

// ============================================================================
// Maintenance Tests
// ============================================================================

#[test]
fn test_maintenance_exit_scenario() {
    let node = node_in(NodeStatus::Active);
    node.enter_maintenance("disk full").unwrap();
    assert_eq!(node.maintenance_reason().as_deref(), Some("disk full"));
    let version = node.version();

    assert!(node.exit_maintenance().unwrap());

    assert_eq!(node.status(), NodeStatus::Active);
    assert!(node.maintenance_reason().is_none());
    assert_eq!(node.version(), version + 1);
    assert!(node.is_available());
}

#[test]
fn test_exit_maintenance_only_leaves_maintenance() {
    let inactive = node_in(NodeStatus::Inactive);
    assert!(matches!(
        inactive.exit_maintenance(),
        Err(NodeError::Transition(_))
    ));
    assert_eq!(inactive.status(), NodeStatus::Inactive);
    assert_eq!(inactive.version(), 1);

    let active = node_in(NodeStatus::Active);
    let version = active.version();
    assert!(!active.exit_maintenance().unwrap());
    assert_eq!(active.version(), version);
}

#[test]
fn test_empty_reason_fails_in_every_state() {
    for status in NodeStatus::ALL {
        let node = node_in(status);
        let version = node.version();
        let err = node.enter_maintenance("").unwrap_err();
        assert!(matches!(
            err,
            NodeError::Validation(ValidationError::EmptyMaintenanceReason)
        ));
        assert_eq!(node.status(), status);
        assert_eq!(node.version(), version);
    }
}

// ============================================================================
// Credential Tests
// ============================================================================

#[test]
fn test_credential_purge_scenario() {
    let node = shadowsocks_node("1.2.3.4");
    let plaintext = node.plain_api_token().expect("token issued at creation");
    let version = node.version();

    assert!(node.clear_plain_api_token());

    assert!(node.plain_api_token().is_none());
    assert_eq!(node.version(), version);
    assert!(node.verify_api_token(&plaintext));
    assert_eq!(node.api_token_hash(), node_core::node::hash_token(&plaintext));
}

#[test]
fn test_token_mutation_rejected() {
    let node = shadowsocks_node("1.2.3.4");
    let plaintext = node.plain_api_token().unwrap();
    let last = plaintext.chars().last().unwrap();
    let replacement = if last == 'x' { 'y' } else { 'x' };
    let mutated = format!("{}{replacement}", &plaintext[..plaintext.len() - 1]);

    assert!(node.verify_api_token(&plaintext));
    assert!(!node.verify_api_token(&mutated));
}

// ============================================================================
// Derived Query Tests
// ============================================================================

#[test]
fn test_shadowsocks_subscription_scenario() {
    let node = shadowsocks_node("1.2.3.4");
    let uri = node.generate_subscription_uri("unused", "").unwrap();

    let body = uri.strip_prefix("ss://").unwrap();
    let (auth, authority) = body.split_once('@').unwrap();
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(auth)
        .unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), "aes-256-gcm:password123");
    assert_eq!(authority, "1.2.3.4:8388");
}

#[test]
fn test_effective_address_from_agent() {
    let node = shadowsocks_node("");
    assert_eq!(node.effective_server_address(), "");

    node.record_agent_report(
        AgentReport {
            public_ipv4: Some(Ipv4Addr::new(192, 0, 2, 10)),
            agent_version: Some("2.1.0".into()),
            ..AgentReport::default()
        },
        Utc::now(),
    );
    assert_eq!(node.effective_server_address(), "192.0.2.10");
    assert!(node.is_online());

    let uri = node.generate_subscription_uri("", "").unwrap();
    assert!(uri.ends_with("@192.0.2.10:8388"));
}

#[test]
fn test_protocol_is_immutable() {
    let node = Node::create(
        NodeDraft::new(
            "edge",
            "edge.example.com",
            443,
            TrojanConfig::new(TlsOptions::with_sni("edge.example.com")),
        ),
        &fixed_sid,
    )
    .unwrap();

    let err = node
        .update_protocol_config(VlessConfig::new(VlessSecurity::None).into())
        .unwrap_err();
    assert!(matches!(err, NodeError::ProtocolMismatch { .. }));
    assert_eq!(node.protocol(), node_core::Protocol::Trojan);
}
