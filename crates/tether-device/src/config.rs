//! Device configuration, loadable from TOML.

use serde::Deserialize;
use tether_session::ConnectionConfig;

/// Top-level configuration for one device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Alias the identity is stored under in the keystore.
    #[serde(default = "default_alias")]
    pub alias: String,
    /// Access policy attached to a newly provisioned certificate.
    /// The policy itself must already exist at the authority.
    pub policy_name: String,
    /// Directory holding the keystore container.
    pub keystore_dir: String,
    /// Keystore container file name.
    #[serde(default = "default_keystore_name")]
    pub keystore_name: String,
    /// Passphrase protecting the keystore container.
    pub passphrase: String,
    /// MQTT connection settings.
    pub mqtt: ConnectionConfig,
}

fn default_alias() -> String {
    "default".into()
}

fn default_keystore_name() -> String {
    "iot_keystore".into()
}

impl DeviceConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
