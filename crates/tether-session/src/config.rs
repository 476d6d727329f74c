//! Session connection configuration, loadable from TOML or environment.

use rumqttc::QoS;
use serde::Deserialize;

use crate::error::{SessionError, SessionResult};

/// Maximum MQTT payload size in bytes.
/// Most managed brokers cap payloads at 128 KB; headroom for packet
/// headers and topic strings is the publisher's problem.
pub const DEFAULT_MAX_PAYLOAD: usize = 128 * 1024;

/// MQTT connection configuration. Immutable once a `SessionManager`
/// is constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// MQTT client ID (should be unique per device).
    pub client_id: String,
    /// Broker hostname (e.g. an IoT endpoint).
    pub endpoint_host: String,
    /// Broker port (default 8883 for TLS).
    #[serde(default = "default_port")]
    pub endpoint_port: u16,
    /// Enable TLS (mTLS with the device identity). When false,
    /// connects plaintext (local dev / tests only).
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Path to the CA certificate (PEM) used to verify the broker.
    #[serde(default)]
    pub ca_cert_path: String,
    /// Keep-alive interval in seconds. Must be > 0; a missed ping
    /// acknowledgment within the derived timeout forces ConnectionLost.
    #[serde(default = "default_keepalive")]
    pub keep_alive_secs: u16,
    /// Last Will and Testament published by the broker on unclean
    /// disconnect.
    #[serde(default)]
    pub last_will: Option<LastWillConfig>,
    /// Maximum publish payload size in bytes.
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: usize,
    /// Base reconnect backoff in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Reconnect backoff cap in seconds.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

/// LWT message configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LastWillConfig {
    pub topic: String,
    pub message: String,
    /// QoS level 0..=2 (default 0).
    #[serde(default)]
    pub qos: u8,
}

impl LastWillConfig {
    pub(crate) fn qos_level(&self) -> QoS {
        match self.qos {
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            _ => QoS::AtMostOnce,
        }
    }
}

fn default_port() -> u16 {
    8883
}

fn default_use_tls() -> bool {
    true
}

fn default_keepalive() -> u16 {
    30
}

fn default_max_payload() -> usize {
    DEFAULT_MAX_PAYLOAD
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_secs() -> u64 {
    60
}

impl ConnectionConfig {
    /// Validate invariants the type system can't express.
    pub fn validate(&self) -> SessionResult<()> {
        if self.client_id.is_empty() {
            return Err(SessionError::Config("client_id must not be empty".into()));
        }
        if self.keep_alive_secs == 0 {
            return Err(SessionError::Config("keep_alive_secs must be > 0".into()));
        }
        if let Some(lwt) = &self.last_will {
            if lwt.qos > 2 {
                return Err(SessionError::Config(format!(
                    "last_will qos {} out of range",
                    lwt.qos
                )));
            }
        }
        if self.backoff_base_ms == 0 {
            return Err(SessionError::Config("backoff_base_ms must be > 0".into()));
        }
        Ok(())
    }
}
