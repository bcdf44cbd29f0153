//! AnyTLS node configuration
//!
//! AnyTLS serializes its own subscription URI instead of going through the
//! shared factory.

use serde::{Deserialize, Serialize};

use super::{Protocol, TlsOptions};
use crate::error::ValidationError;
use crate::subscription::{fragment, Endpoint, QueryString};

/// AnyTLS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyTlsConfig {
    /// TLS client options
    #[serde(default)]
    pub tls: TlsOptions,

    /// Interval between idle session checks, in seconds
    #[serde(default = "default_idle_check_interval")]
    pub idle_session_check_interval_secs: u32,

    /// Idle time after which a session is closed, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_session_timeout_secs: u32,

    /// Minimum number of idle sessions kept open
    #[serde(default)]
    pub min_idle_session: u32,
}

fn default_idle_check_interval() -> u32 {
    30
}

fn default_idle_timeout() -> u32 {
    30
}

impl Default for AnyTlsConfig {
    fn default() -> Self {
        Self {
            tls: TlsOptions::default(),
            idle_session_check_interval_secs: default_idle_check_interval(),
            idle_session_timeout_secs: default_idle_timeout(),
            min_idle_session: 0,
        }
    }
}

impl AnyTlsConfig {
    /// Create an AnyTLS config with the given TLS options
    #[must_use]
    pub fn new(tls: TlsOptions) -> Self {
        Self {
            tls,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for zero idle intervals or invalid TLS options.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_session_check_interval_secs == 0 || self.idle_session_timeout_secs == 0 {
            return Err(ValidationError::protocol_config(
                Protocol::AnyTls,
                "idle session intervals must be greater than 0",
            ));
        }
        self.tls.validate(Protocol::AnyTls)
    }

    /// Build the `anytls://` subscription URI
    ///
    /// Format: `anytls://<password>@<host>:<port>/?sni=..&insecure=1#<remarks>`
    #[must_use]
    pub fn to_subscription_uri(&self, endpoint: &Endpoint, password: &str, remarks: &str) -> String {
        let mut query = QueryString::new();
        query.push_opt("sni", self.tls.sni.as_deref());
        query.push_opt("fp", self.tls.fingerprint.map(|f| f.as_str()));
        query.push_opt("alpn", self.tls.alpn_param().as_deref());
        query.push_flag("insecure", self.tls.allow_insecure);

        format!(
            "anytls://{}@{}/{}{}",
            urlencoding::encode(password),
            endpoint.authority(),
            query.to_query_suffix(),
            fragment(remarks)
        )
    }
}
