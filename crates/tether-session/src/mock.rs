//! Mock transport and session for testing without a real broker.
//!
//! `MockTransport` records publishes and subscription filters for
//! assertion, injects failures, and can loop published messages back
//! through a subscription table so tests get full publish→callback
//! round trips. `MockSession` wires one to a facade in a chosen state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rumqttc::QoS;
use tokio::sync::broadcast;

use crate::client::PubSubClient;
use crate::config::DEFAULT_MAX_PAYLOAD;
use crate::error::{SessionError, SessionResult};
use crate::session::SessionShared;
use crate::state::{SessionState, StatusEvent};
use crate::subscriptions::SubscriptionTable;
use crate::transport::Transport;

/// A recorded publish call.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

/// Mock implementation of the `Transport` trait.
///
/// Thread-safe via `Mutex` (fine for test contexts).
pub struct MockTransport {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<(String, QoS)>>,
    unsubscriptions: Mutex<Vec<String>>,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
    loopback: Mutex<Option<Arc<SubscriptionTable>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            unsubscriptions: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            loopback: Mutex::new(None),
        }
    }

    /// Route published messages back through `table`, acting as a
    /// single-client broker.
    pub fn set_loopback(&self, table: Arc<SubscriptionTable>) {
        *self.loopback.lock().unwrap() = Some(table);
    }

    /// Make `publish` fail.
    pub fn fail_publish(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    /// Make `subscribe` fail.
    pub fn fail_subscribe(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    /// Get all published messages.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Get published messages for a specific topic.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Check whether a subscription was made to the given filter.
    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .any(|(f, _)| f == filter)
    }

    /// All unsubscribed filters, in order.
    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscriptions.lock().unwrap().clone()
    }

    /// Clear all recorded state.
    pub fn reset(&self) {
        self.published.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
        self.unsubscriptions.lock().unwrap().clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> SessionResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(SessionError::Transport("mock publish failure".into()));
        }
        self.published.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        });

        let loopback = self.loopback.lock().unwrap().clone();
        if let Some(table) = loopback {
            table.dispatch(topic, payload);
        }
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> SessionResult<()> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(SessionError::Transport("mock subscribe failure".into()));
        }
        self.subscriptions
            .lock()
            .unwrap()
            .push((filter.to_string(), qos));
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> SessionResult<()> {
        self.unsubscriptions
            .lock()
            .unwrap()
            .push(filter.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> SessionResult<()> {
        Ok(())
    }
}

// ── Mock session ──────────────────────────────────────────────

/// A facade wired to a `MockTransport`, with test control over the
/// session state. Loopback is enabled, so publishing to a subscribed
/// filter delivers the callback like a real broker would.
pub struct MockSession {
    shared: Arc<SessionShared>,
    transport: Arc<MockTransport>,
    client: PubSubClient,
}

impl MockSession {
    /// A session already in the Connected state.
    pub fn connected() -> Self {
        Self::with_state(SessionState::Connected)
    }

    /// A session in the Disconnected state.
    pub fn disconnected() -> Self {
        Self::with_state(SessionState::Disconnected)
    }

    fn with_state(state: SessionState) -> Self {
        let shared = SessionShared::new(state);
        let transport = Arc::new(MockTransport::new());
        transport.set_loopback(Arc::clone(&shared.table));

        let slot: crate::client::SharedTransport = Arc::new(Mutex::new(Some(
            Arc::clone(&transport) as Arc<dyn Transport>,
        )));
        let client = PubSubClient::new(Arc::clone(&shared), slot, DEFAULT_MAX_PAYLOAD);

        Self {
            shared,
            transport,
            client,
        }
    }

    /// The pub/sub facade under test.
    pub fn client(&self) -> PubSubClient {
        self.client.clone()
    }

    /// The underlying mock transport, for assertions.
    pub fn transport(&self) -> &MockTransport {
        &self.transport
    }

    /// Force a session state, emitting the usual status event.
    pub fn set_state(&self, state: SessionState) {
        self.shared.transition(state, None);
    }

    /// Stream of state transitions.
    pub fn status_events(&self) -> broadcast::Receiver<StatusEvent> {
        self.shared.subscribe_events()
    }

    /// Inject an inbound message as if the broker had published it.
    pub fn inject(&self, topic: &str, payload: &[u8]) -> usize {
        self.shared.table.dispatch(topic, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_records_messages() {
        let mock = MockTransport::new();
        mock.publish("test/topic", b"hello", QoS::AtMostOnce)
            .await
            .unwrap();
        mock.publish("test/other", b"world", QoS::AtMostOnce)
            .await
            .unwrap();

        let msgs = mock.published();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].topic, "test/topic");
        assert_eq!(msgs[0].payload, b"hello");
        assert_eq!(mock.published_to("test/other").len(), 1);
    }

    #[tokio::test]
    async fn subscribe_records_filters() {
        let mock = MockTransport::new();
        mock.subscribe("device/+/status", QoS::AtMostOnce)
            .await
            .unwrap();

        assert!(mock.is_subscribed_to("device/+/status"));
        assert!(!mock.is_subscribed_to("device/+/other"));
    }

    #[tokio::test]
    async fn failure_injection() {
        let mock = MockTransport::new();
        mock.fail_publish();
        let err = mock.publish("t", b"d", QoS::AtMostOnce).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[tokio::test]
    async fn reset_clears_state() {
        let mock = MockTransport::new();
        mock.publish("t", b"d", QoS::AtMostOnce).await.unwrap();
        mock.subscribe("f", QoS::AtMostOnce).await.unwrap();
        mock.unsubscribe("f").await.unwrap();

        mock.reset();
        assert!(mock.published().is_empty());
        assert!(!mock.is_subscribed_to("f"));
        assert!(mock.unsubscribed().is_empty());
    }

    #[tokio::test]
    async fn mock_session_roundtrip() {
        let session = MockSession::connected();
        let client = session.client();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        client
            .subscribe("sensors/temp", QoS::AtMostOnce, move |msg| {
                let _ = tx.send(msg);
            })
            .await
            .unwrap();

        client
            .publish("sensors/temp", b"21.5", QoS::AtMostOnce)
            .await
            .unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "sensors/temp");
        assert_eq!(msg.payload, b"21.5");
    }

    #[tokio::test]
    async fn disconnected_session_rejects_operations() {
        let session = MockSession::disconnected();
        let client = session.client();

        let err = client
            .publish("t", b"d", QoS::AtMostOnce)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));

        let err = client
            .subscribe("t", QoS::AtMostOnce, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }
}
