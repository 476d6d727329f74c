//! Pub/sub facade over an active session.
//!
//! Typed subscribe/unsubscribe/publish with per-topic callback
//! dispatch. All operations check the session state; nothing is queued
//! while disconnected; callers resubscribe after a reconnect.

use std::sync::{Arc, Mutex as StdMutex};

use rumqttc::QoS;

use crate::error::{SessionError, SessionResult};
use crate::session::SessionShared;
use crate::state::SessionState;
use crate::subscriptions::InboundMessage;
use crate::transport::Transport;

/// The transport slot shared between the session manager and facades.
/// Swapped on each connect, emptied on disconnect.
pub(crate) type SharedTransport = Arc<StdMutex<Option<Arc<dyn Transport>>>>;

/// Cheap-to-clone pub/sub handle bound to one session.
#[derive(Clone)]
pub struct PubSubClient {
    shared: Arc<SessionShared>,
    transport: SharedTransport,
    max_payload: usize,
}

impl PubSubClient {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        transport: SharedTransport,
        max_payload: usize,
    ) -> Self {
        Self {
            shared,
            transport,
            max_payload,
        }
    }

    /// Current session state, as the facade sees it.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared.table.len()
    }

    fn connected_transport(&self) -> SessionResult<Arc<dyn Transport>> {
        if self.shared.state() != SessionState::Connected {
            return Err(SessionError::NotConnected);
        }
        self.transport
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::NotConnected)
    }

    /// Register `on_message` for `filter` and subscribe on the wire.
    ///
    /// Fails with `NotConnected` unless the session is Connected;
    /// subscription intents are not queued while disconnected.
    pub async fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        on_message: impl Fn(InboundMessage) + Send + Sync + 'static,
    ) -> SessionResult<()> {
        let transport = self.connected_transport()?;

        let replaced = self.shared.table.insert(filter, Arc::new(on_message));
        if replaced {
            tracing::debug!(filter = %filter, "replaced existing subscription handler");
        }

        if let Err(e) = transport.subscribe(filter, qos).await {
            // Keep the table consistent with the wire.
            self.shared.table.remove(filter);
            return Err(e);
        }
        tracing::info!(filter = %filter, qos = ?qos, "subscribed");
        Ok(())
    }

    /// Remove the subscription for `filter`.
    ///
    /// Table entries can be removed in any session state; the wire
    /// UNSUBSCRIBE is only sent while Connected.
    pub async fn unsubscribe(&self, filter: &str) -> SessionResult<()> {
        if !self.shared.table.remove(filter) {
            return Err(SessionError::NotFound {
                filter: filter.to_string(),
            });
        }

        if self.shared.state() == SessionState::Connected {
            let transport = self.connected_transport()?;
            transport.unsubscribe(filter).await?;
        }
        tracing::info!(filter = %filter, "unsubscribed");
        Ok(())
    }

    /// Publish a payload, fire-and-forget for `QoS::AtMostOnce`.
    pub async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> SessionResult<()> {
        if payload.len() > self.max_payload {
            return Err(SessionError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        let transport = self.connected_transport()?;
        transport.publish(topic, payload, qos).await?;
        tracing::debug!(topic = %topic, bytes = payload.len(), "published");
        Ok(())
    }
}
