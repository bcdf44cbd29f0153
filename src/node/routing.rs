//! Per-node route and DNS overrides
//!
//! These are pushed to the node agent as-is; the aggregate only checks that
//! they are structurally sound.

use std::collections::HashSet;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use super::address::is_valid_domain;
use crate::error::ValidationError;

/// Where matched traffic goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteOutbound {
    /// Connect directly from the node
    #[default]
    Direct,
    /// Drop
    Block,
    /// Forward through the node's upstream proxy
    Proxy,
}

/// A single routing rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Exact domains
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,

    /// Domain suffixes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_suffix: Vec<String>,

    /// Destination networks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_cidr: Vec<IpNet>,

    /// Target outbound
    pub outbound: RouteOutbound,
}

impl RouteRule {
    /// Create an empty rule targeting `outbound`
    #[must_use]
    pub fn to(outbound: RouteOutbound) -> Self {
        Self {
            outbound,
            ..Self::default()
        }
    }

    /// Add exact domains
    #[must_use]
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domain.extend(domains.into_iter().map(Into::into));
        self
    }

    /// Add domain suffixes
    #[must_use]
    pub fn suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domain_suffix.extend(suffixes.into_iter().map(Into::into));
        self
    }

    /// Add destination networks
    #[must_use]
    pub fn cidrs(mut self, nets: impl IntoIterator<Item = IpNet>) -> Self {
        self.ip_cidr.extend(nets);
        self
    }

    fn has_matchers(&self) -> bool {
        !(self.domain.is_empty() && self.domain_suffix.is_empty() && self.ip_cidr.is_empty())
    }
}

/// Route override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Rules, evaluated in order
    #[serde(default)]
    pub rules: Vec<RouteRule>,

    /// Outbound when no rule matches
    #[serde(default, rename = "final")]
    pub final_outbound: RouteOutbound,
}

impl RouteConfig {
    /// Validate structure
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidRoute` for a rule without matchers
    /// or a malformed domain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, rule) in self.rules.iter().enumerate() {
            if !rule.has_matchers() {
                return Err(ValidationError::InvalidRoute(format!(
                    "rule {i} has no matchers"
                )));
            }

            for domain in &rule.domain {
                if !is_valid_domain(domain) {
                    return Err(ValidationError::InvalidRoute(format!(
                        "rule {i}: invalid domain '{domain}'"
                    )));
                }
            }

            for suffix in &rule.domain_suffix {
                let trimmed = suffix.trim_start_matches('.');
                if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
                    return Err(ValidationError::InvalidRoute(format!(
                        "rule {i}: invalid domain suffix '{suffix}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// DNS resolution strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsStrategy {
    #[default]
    PreferIpv4,
    PreferIpv6,
    Ipv4Only,
    Ipv6Only,
}

/// Upstream DNS server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsServer {
    /// Unique tag
    pub tag: String,
    /// Server address (e.g. `8.8.8.8`, `tls://1.1.1.1`, `https://dns.google/dns-query`)
    pub address: String,
}

impl DnsServer {
    /// Create a DNS server entry
    #[must_use]
    pub fn new(tag: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            address: address.into(),
        }
    }
}

/// DNS override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Upstream servers
    pub servers: Vec<DnsServer>,

    /// Tag of the server used when nothing else applies
    #[serde(default, rename = "final", skip_serializing_if = "Option::is_none")]
    pub final_server: Option<String>,

    /// Resolution strategy
    #[serde(default)]
    pub strategy: DnsStrategy,
}

impl DnsConfig {
    /// Validate structure
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidDns` for an empty server list, empty
    /// or duplicate tags, empty addresses, or a final tag that names no server.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.servers.is_empty() {
            return Err(ValidationError::InvalidDns("no servers configured".into()));
        }

        let mut tags = HashSet::with_capacity(self.servers.len());
        for server in &self.servers {
            if server.tag.trim().is_empty() {
                return Err(ValidationError::InvalidDns("server tag cannot be empty".into()));
            }
            if server.address.trim().is_empty() {
                return Err(ValidationError::InvalidDns(format!(
                    "server '{}' has no address",
                    server.tag
                )));
            }
            if !tags.insert(server.tag.as_str()) {
                return Err(ValidationError::InvalidDns(format!(
                    "duplicate server tag '{}'",
                    server.tag
                )));
            }
        }

        if let Some(ref final_server) = self.final_server {
            if !tags.contains(final_server.as_str()) {
                return Err(ValidationError::InvalidDns(format!(
                    "final server '{final_server}' is not defined"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_valid() {
        let config = RouteConfig {
            rules: vec![
                RouteRule::to(RouteOutbound::Block).suffixes(["ads.example.com"]),
                RouteRule::to(RouteOutbound::Direct)
                    .domains(["intranet.example.com"])
                    .cidrs(["10.0.0.0/8".parse().unwrap()]),
            ],
            final_outbound: RouteOutbound::Proxy,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_route_rule_without_matchers() {
        let config = RouteConfig {
            rules: vec![RouteRule::to(RouteOutbound::Block)],
            ..RouteConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no matchers"));
    }

    #[test]
    fn test_route_invalid_domain() {
        let config = RouteConfig {
            rules: vec![RouteRule::to(RouteOutbound::Direct).domains(["not a domain"])],
            ..RouteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_route_deserialization() {
        let json = r#"{"rules":[{"ip_cidr":["192.168.0.0/16"],"outbound":"direct"}],"final":"proxy"}"#;
        let config: RouteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.final_outbound, RouteOutbound::Proxy);
        assert!(config.validate().is_ok());

        let bad = r#"{"rules":[{"ip_cidr":["300.0.0.0/8"],"outbound":"direct"}]}"#;
        assert!(serde_json::from_str::<RouteConfig>(bad).is_err());
    }

    #[test]
    fn test_dns_valid() {
        let config = DnsConfig {
            servers: vec![
                DnsServer::new("google", "tls://8.8.8.8"),
                DnsServer::new("local", "223.5.5.5"),
            ],
            final_server: Some("google".into()),
            strategy: DnsStrategy::Ipv4Only,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dns_invalid() {
        assert!(DnsConfig::default().validate().is_err());

        let duplicate = DnsConfig {
            servers: vec![DnsServer::new("a", "1.1.1.1"), DnsServer::new("a", "8.8.8.8")],
            ..DnsConfig::default()
        };
        assert!(duplicate.validate().unwrap_err().to_string().contains("duplicate"));

        let dangling = DnsConfig {
            servers: vec![DnsServer::new("a", "1.1.1.1")],
            final_server: Some("b".into()),
            ..DnsConfig::default()
        };
        assert!(dangling.validate().is_err());

        let empty_address = DnsConfig {
            servers: vec![DnsServer::new("a", " ")],
            ..DnsConfig::default()
        };
        assert!(empty_address.validate().is_err());
    }
}
