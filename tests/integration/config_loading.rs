//! Configuration file driving node policy

use std::io::Write;

use chrono::{Duration, Utc};
use tempfile::NamedTempFile;

use node_core::config::{create_default_config, load_config, CoreConfig};
use node_core::node::{AgentReport, Node, NodeDraft, NodeRegistry};
use node_core::protocol::TuicConfig;
use node_core::ConfigError;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn tuic_node(sid: &'static str) -> Node {
    Node::create(
        NodeDraft::new(sid, "q.example.com", 443, TuicConfig::default()),
        &move || sid.to_string(),
    )
    .unwrap()
}

#[test]
fn test_policy_from_file_drives_online_window() {
    let file = write_config(
        r#"{
            "log": { "level": "debug", "format": "json" },
            "node": { "online_window_secs": 60, "expiring_soon_days": 3 }
        }"#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.log.level, "debug");
    assert!(config.log.is_json());

    let registry = NodeRegistry::new();
    let fresh = tuic_node("fresh");
    let stale = tuic_node("stale");
    fresh.record_agent_report(AgentReport::default(), Utc::now() - Duration::seconds(30));
    stale.record_agent_report(AgentReport::default(), Utc::now() - Duration::seconds(120));
    registry.insert(fresh).unwrap();
    registry.insert(stale).unwrap();

    let online = registry.online(&config.node);
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].sid(), "fresh");

    // the stale node is still inside the default five minute window
    assert_eq!(registry.online(&CoreConfig::default().node).len(), 2);
}

#[test]
fn test_policy_from_file_drives_expiry_window() {
    let file = write_config(r#"{ "node": { "expiring_soon_days": 3 } }"#);
    let config = load_config(file.path()).unwrap();

    let node = tuic_node("exp");
    node.set_expires_at(Some(Utc::now() + Duration::days(5)));

    assert!(!node.is_expiring_soon_with(&config.node));
    assert!(node.is_expiring_soon_with(&CoreConfig::default().node));
}

#[test]
fn test_invalid_policy_rejected() {
    let file = write_config(r#"{ "node": { "online_window_secs": 0 } }"#);
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_default_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("node-core.json");
    create_default_config(&path).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.node.online_window_secs, 300);
    assert_eq!(config.node.expiring_soon_days, 7);
    assert_eq!(config.log.level, "info");
}
