//! Share links generated through the node aggregate

use std::sync::Arc;

use base64::Engine;

use node_core::node::{Node, NodeDraft};
use node_core::protocol::{
    AnyTlsConfig, Hysteria2Config, Protocol, ProtocolConfig, TlsOptions, Transport, TrojanConfig,
    TuicConfig, VlessConfig, VlessSecurity, VmessCipher, VmessConfig,
};
use node_core::shadowsocks::{EncryptionConfig, PluginConfig, ShadowsocksConfig};
use node_core::subscription::{SubscriptionUriFactory, UriBuilder, UriRequest};
use node_core::{NodeError, SubscriptionError};

const SECRET: &str = "8b4e1f0a-5c0d-4f6b-9e2a-3d7c1b9a0e55";

fn node(address: &str, config: impl Into<ProtocolConfig>) -> Node {
    Node::create(
        NodeDraft::new("Edge", address, 443, config),
        &|| "edge-1".to_string(),
    )
    .unwrap()
}

#[test]
fn test_every_protocol_has_a_link() {
    let configs: Vec<ProtocolConfig> = vec![
        ShadowsocksConfig::new(EncryptionConfig::new("aes-128-gcm", "password123").unwrap()).into(),
        TrojanConfig::new(TlsOptions::with_sni("edge.example.com")).into(),
        VlessConfig::new(VlessSecurity::Tls(TlsOptions::with_sni("edge.example.com"))).into(),
        VmessConfig::new(VmessCipher::Auto).into(),
        Hysteria2Config::new(TlsOptions::with_sni("edge.example.com")).into(),
        TuicConfig::default().into(),
        AnyTlsConfig::new(TlsOptions::with_sni("edge.example.com")).into(),
    ];

    for config in configs {
        let protocol = config.protocol();
        let uri = node("edge.example.com", config)
            .generate_subscription_uri(SECRET, "Edge")
            .unwrap();
        assert!(
            uri.starts_with(&format!("{}://", protocol.uri_scheme())),
            "{protocol}: {uri}"
        );
        if protocol != Protocol::Vmess {
            assert!(uri.contains("edge.example.com:443"), "{protocol}: {uri}");
            assert!(uri.ends_with("#Edge"), "{protocol}: {uri}");
        }
    }
}

#[test]
fn test_shadowsocks_plugin_link() {
    let config = ShadowsocksConfig::new(EncryptionConfig::new("aes-256-gcm", "password123").unwrap())
        .with_plugin(PluginConfig::new("v2ray-plugin", "websocket", Some("cdn.example.com")).unwrap());
    let uri = node("1.2.3.4", config)
        .generate_subscription_uri("", "")
        .unwrap();
    assert!(uri.starts_with("ss://"));
    assert!(uri.contains("@1.2.3.4:443/?plugin=v2ray-plugin"));
    assert!(!uri.contains('#'));
}

#[test]
fn test_vmess_payload_uses_subscription_port() {
    let node = Node::create(
        NodeDraft::new(
            "VMess WS",
            "2001:db8::7",
            9000,
            VmessConfig::new(VmessCipher::Chacha20Poly1305).with_transport(Transport::ws("/ray")),
        )
        .with_subscription_port(8443),
        &|| "vm".to_string(),
    )
    .unwrap();

    let uri = node.generate_subscription_uri(SECRET, "VMess WS").unwrap();
    let payload = base64::engine::general_purpose::STANDARD
        .decode(uri.strip_prefix("vmess://").unwrap())
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

    assert_eq!(value["add"], "2001:db8::7");
    assert_eq!(value["port"], "8443");
    assert_eq!(value["id"], SECRET);
    assert_eq!(value["net"], "ws");
    assert_eq!(value["path"], "/ray");
}

#[test]
fn test_missing_address() {
    let node = node("", TuicConfig::default());
    let err = node.generate_subscription_uri(SECRET, "").unwrap_err();
    assert!(matches!(
        err,
        NodeError::Subscription(SubscriptionError::MissingAddress)
    ));
}

#[test]
fn test_remarks_from_policy_template() {
    let policy = node_core::NodePolicy {
        default_remarks_template: "{name} ({protocol})".into(),
        ..node_core::NodePolicy::default()
    };
    let node = node("edge.example.com", TrojanConfig::new(TlsOptions::with_sni("edge.example.com")));
    let remarks = node.subscription_remarks(&policy);
    assert_eq!(remarks, "Edge (trojan)");

    let uri = node.generate_subscription_uri(SECRET, &remarks).unwrap();
    assert!(uri.ends_with("#Edge%20%28trojan%29"));
}

// ============================================================================
// Custom builders
// ============================================================================

struct ClashLinkBuilder;

impl UriBuilder for ClashLinkBuilder {
    fn protocol(&self) -> Protocol {
        Protocol::Vless
    }

    fn build(&self, request: &UriRequest<'_>) -> Result<String, SubscriptionError> {
        Ok(format!("clash-vless://{}/{}", request.endpoint, request.remarks))
    }
}

#[test]
fn test_registered_builder_replaces_default() {
    let mut factory = SubscriptionUriFactory::with_default_builders();
    let replaced = factory.register(Arc::new(ClashLinkBuilder));
    assert!(replaced.is_some());

    let node = node("edge.example.com", VlessConfig::new(VlessSecurity::None));
    let uri = node
        .generate_subscription_uri_with(&factory, SECRET, "Edge")
        .unwrap();
    assert_eq!(uri, "clash-vless://edge.example.com:443/Edge");

    // the shared factory keeps the stock builder
    let stock = node.generate_subscription_uri(SECRET, "Edge").unwrap();
    assert!(stock.starts_with("vless://"));
}

#[test]
fn test_empty_factory_reports_unsupported() {
    let factory = SubscriptionUriFactory::new();
    let node = node("edge.example.com", TuicConfig::default());
    let err = node
        .generate_subscription_uri_with(&factory, SECRET, "")
        .unwrap_err();
    assert!(matches!(
        err,
        NodeError::Subscription(SubscriptionError::UnsupportedProtocol(Protocol::Tuic))
    ));
}
