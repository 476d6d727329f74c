//! Transport seam between the facade and the wire.
//!
//! `MqttTransport` wraps `rumqttc::AsyncClient`; mTLS options are
//! built from the in-memory device identity rather than certificate
//! files, since the keystore owns the PEM material.

use async_trait::async_trait;
use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS, TlsConfiguration};

use tether_identity::DeviceIdentity;

use crate::config::ConnectionConfig;
use crate::error::{SessionError, SessionResult};

/// Abstraction over the MQTT wire operations the facade needs.
///
/// Enables mocking in tests without a real broker.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> SessionResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> SessionResult<()>;

    /// Unsubscribe from a topic filter.
    async fn unsubscribe(&self, filter: &str) -> SessionResult<()>;

    /// Send an MQTT DISCONNECT.
    async fn disconnect(&self) -> SessionResult<()>;
}

/// Transport backed by a live `rumqttc` client.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> SessionResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> SessionResult<()> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn unsubscribe(&self, filter: &str) -> SessionResult<()> {
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn disconnect(&self) -> SessionResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}

/// Build MQTT options for one connection attempt.
///
/// Keep-alive and LWT come from the config; client authentication uses
/// the identity's certificate chain and private key, with the CA cert
/// read from `ca_cert_path` to verify the broker.
pub(crate) fn build_mqtt_options(
    config: &ConnectionConfig,
    identity: &DeviceIdentity,
) -> SessionResult<MqttOptions> {
    let mut options = MqttOptions::new(
        &config.client_id,
        &config.endpoint_host,
        config.endpoint_port,
    );
    options.set_keep_alive(std::time::Duration::from_secs(config.keep_alive_secs.into()));

    if let Some(lwt) = &config.last_will {
        options.set_last_will(LastWill::new(
            &lwt.topic,
            lwt.message.clone().into_bytes(),
            lwt.qos_level(),
            false,
        ));
    }

    if config.use_tls {
        let ca = std::fs::read(&config.ca_cert_path).map_err(|e| {
            SessionError::Transport(format!(
                "failed to read CA cert '{}': {e}",
                config.ca_cert_path
            ))
        })?;
        options.set_transport(rumqttc::Transport::tls_with_config(
            TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: Some((
                    identity.certificate_chain.clone(),
                    identity.private_key.clone(),
                )),
            },
        ));
    }

    Ok(options)
}
