//! TUIC v5 node configuration

use serde::{Deserialize, Serialize};

use super::{Protocol, TlsOptions};
use crate::error::ValidationError;

/// QUIC congestion control algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionControl {
    Cubic,
    NewReno,
    #[default]
    Bbr,
}

impl CongestionControl {
    /// Algorithm name used in share links
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cubic => "cubic",
            Self::NewReno => "new_reno",
            Self::Bbr => "bbr",
        }
    }
}

/// UDP relay mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UdpRelayMode {
    /// Native QUIC datagrams
    #[default]
    Native,
    /// UDP over QUIC streams
    Quic,
}

impl UdpRelayMode {
    /// Mode name used in share links
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Quic => "quic",
        }
    }
}

/// TUIC configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuicConfig {
    /// Congestion control
    #[serde(default)]
    pub congestion_control: CongestionControl,

    /// UDP relay mode
    #[serde(default)]
    pub udp_relay_mode: UdpRelayMode,

    /// Enable 0-RTT handshake
    #[serde(default)]
    pub zero_rtt: bool,

    /// TLS client options; ALPN defaults to `h3`
    #[serde(default = "default_tuic_tls")]
    pub tls: TlsOptions,
}

fn default_tuic_tls() -> TlsOptions {
    TlsOptions::default().alpn(["h3"])
}

impl Default for TuicConfig {
    fn default() -> Self {
        Self {
            congestion_control: CongestionControl::default(),
            udp_relay_mode: UdpRelayMode::default(),
            zero_rtt: false,
            tls: default_tuic_tls(),
        }
    }
}

impl TuicConfig {
    /// Set the congestion control algorithm
    #[must_use]
    pub fn with_congestion_control(mut self, cc: CongestionControl) -> Self {
        self.congestion_control = cc;
        self
    }

    /// Set the UDP relay mode
    #[must_use]
    pub fn with_udp_relay_mode(mut self, mode: UdpRelayMode) -> Self {
        self.udp_relay_mode = mode;
        self
    }

    /// Set TLS options
    #[must_use]
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS options are invalid or no ALPN is set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tls.alpn.is_empty() {
            return Err(ValidationError::protocol_config(
                Protocol::Tuic,
                "at least one ALPN protocol is required",
            ));
        }
        self.tls.validate(Protocol::Tuic)
    }
}
