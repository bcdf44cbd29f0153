//! Descriptive metadata and agent telemetry attached to a node

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive metadata, replaced as a whole
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// ISO country code (e.g. "JP")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Region or city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Operator notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeMetadata {
    /// Create metadata with a country and region
    #[must_use]
    pub fn located(country: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            region: Some(region.into()),
            ..Self::default()
        }
    }

    /// Set tags
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What a node agent reports in a heartbeat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ipv4: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ipv6: Option<Ipv6Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

/// Last known agent telemetry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTelemetry {
    /// When the agent last reported
    pub last_seen_at: DateTime<Utc>,

    /// Reported state
    #[serde(flatten)]
    pub report: AgentReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = NodeMetadata::located("JP", "Tokyo")
            .with_tags(["premium", "streaming"])
            .with_description("rack 4");
        assert_eq!(meta.country.as_deref(), Some("JP"));
        assert_eq!(meta.tags.len(), 2);
        assert_ne!(meta, NodeMetadata::default());
    }

    #[test]
    fn test_telemetry_serialization_flattens_report() {
        let telemetry = AgentTelemetry {
            last_seen_at: Utc::now(),
            report: AgentReport {
                public_ipv4: Some(Ipv4Addr::new(203, 0, 113, 7)),
                agent_version: Some("1.4.2".into()),
                ..AgentReport::default()
            },
        };
        let json = serde_json::to_string(&telemetry).unwrap();
        assert!(json.contains("\"public_ipv4\":\"203.0.113.7\""));
        let back: AgentTelemetry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, telemetry);
    }
}
