//! Server address value object
//!
//! A node's configured server address is either an IPv4 address, an IPv6
//! address, a domain name, or empty. Empty means "unset": the effective
//! address then falls back to the public IP reported by the node agent.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a single domain label
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum total length of a domain name
pub const MAX_DOMAIN_LEN: usize = 253;

/// Classification of a server address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// No address configured
    Unset,
    /// IPv4 literal
    Ipv4,
    /// IPv6 literal
    Ipv6,
    /// Domain name
    Domain,
}

/// Validated server address
///
/// Immutable; replace the whole value to change it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddress {
    value: String,
    kind: AddressKind,
}

impl ServerAddress {
    /// Parse and classify an address
    ///
    /// Leading and trailing whitespace is ignored. IPv6 literals may be
    /// given with or without surrounding brackets.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidAddress` if the value is neither
    /// empty, an IP literal, nor a valid domain.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::unset());
        }

        let unbracketed = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);

        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(Self::from_ip(ip));
        }

        if is_valid_domain(trimmed) {
            return Ok(Self {
                value: trimmed.to_ascii_lowercase(),
                kind: AddressKind::Domain,
            });
        }

        Err(ValidationError::InvalidAddress(trimmed.to_string()))
    }

    /// The unset sentinel
    #[must_use]
    pub const fn unset() -> Self {
        Self {
            value: String::new(),
            kind: AddressKind::Unset,
        }
    }

    /// Build from an IP address
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        let kind = match ip {
            IpAddr::V4(_) => AddressKind::Ipv4,
            IpAddr::V6(_) => AddressKind::Ipv6,
        };
        Self {
            value: ip.to_string(),
            kind,
        }
    }

    /// Address as given (normalized)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Address classification
    #[must_use]
    pub const fn kind(&self) -> AddressKind {
        self.kind
    }

    /// Check if the address is the unset sentinel
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.kind, AddressKind::Unset)
    }

    /// Check if the address is an IP literal
    #[must_use]
    pub const fn is_ip(&self) -> bool {
        matches!(self.kind, AddressKind::Ipv4 | AddressKind::Ipv6)
    }

    /// Check if the address is a domain name
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self.kind, AddressKind::Domain)
    }

    /// Parsed IP address, if this is an IP literal
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        if self.is_ip() {
            self.value.parse().ok()
        } else {
            None
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::unset()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServerAddress> for String {
    fn from(address: ServerAddress) -> Self {
        address.value
    }
}

/// Render a host for use inside a URI authority
///
/// IPv6 literals are bracketed; everything else is returned unchanged.
#[must_use]
pub fn uri_host(host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => host.to_string(),
    }
}

/// Check whether a string is a syntactically valid domain name
///
/// Labels are 1..=63 characters of ASCII alphanumerics or `-` and may not
/// start or end with `-`. The whole name is at most 253 characters and the
/// top-level label is at least two alphabetic characters. A single trailing
/// dot is accepted.
#[must_use]
pub fn is_valid_domain(s: &str) -> bool {
    let name = s.strip_suffix('.').unwrap_or(s);
    if name.is_empty() || name.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });
    if !labels_ok {
        return false;
    }

    labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic()))
}
