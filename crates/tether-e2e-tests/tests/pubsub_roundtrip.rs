//! E2E tests for pub/sub delivery through the session client:
//! subscribe → publish → handler dispatch, plus the rejection paths.

mod helpers;

use helpers::{TestHarness, assert_silent, recv_one};
use tether_session::{DEFAULT_MAX_PAYLOAD, QoS, SessionError, SessionState};

/// A message published to a subscribed topic is delivered exactly once.
#[tokio::test]
async fn e2e_publish_delivers_exactly_once() {
    let h = TestHarness::new();
    let client = h.session.client();
    let mut rx = h.subscribe("telemetry/temperature").await;

    client
        .publish("telemetry/temperature", b"21.5", QoS::AtLeastOnce)
        .await
        .unwrap();

    let msg = recv_one(&mut rx).await;
    assert_eq!(msg.topic, "telemetry/temperature");
    assert_eq!(msg.payload, b"21.5");
    assert_silent(&mut rx).await;

    // The wire saw exactly one PUBLISH too.
    assert_eq!(h.session.transport().published_to("telemetry/temperature").len(), 1);
}

/// Wildcard filters receive matching topics and nothing else.
#[tokio::test]
async fn e2e_wildcard_delivery() {
    let h = TestHarness::new();
    let client = h.session.client();
    let mut single = h.subscribe("device/+/status").await;
    let mut multi = h.subscribe("telemetry/#").await;

    client
        .publish("device/rpi-001/status", b"online", QoS::AtMostOnce)
        .await
        .unwrap();
    client
        .publish("telemetry/engine/rpm", b"2400", QoS::AtMostOnce)
        .await
        .unwrap();
    client
        .publish("device/rpi-001/errors/io", b"x", QoS::AtMostOnce)
        .await
        .unwrap();

    assert_eq!(recv_one(&mut single).await.topic, "device/rpi-001/status");
    assert_eq!(recv_one(&mut multi).await.topic, "telemetry/engine/rpm");
    // Neither filter matches the deep errors topic.
    assert_silent(&mut single).await;
    assert_silent(&mut multi).await;
}

/// Broker-initiated messages reach the handler the same way.
#[tokio::test]
async fn e2e_injected_message_dispatches() {
    let h = TestHarness::new();
    let mut rx = h.subscribe("commands/device-001").await;

    let hits = h.session.inject("commands/device-001", b"reboot");
    assert_eq!(hits, 1);
    assert_eq!(recv_one(&mut rx).await.payload, b"reboot");
}

/// Resubscribing a filter replaces the handler; only the new one fires.
#[tokio::test]
async fn e2e_resubscribe_replaces_handler() {
    let h = TestHarness::new();
    let mut old_rx = h.subscribe("alerts").await;
    let mut new_rx = h.subscribe("alerts").await;

    h.session.inject("alerts", b"fire");

    assert_eq!(recv_one(&mut new_rx).await.payload, b"fire");
    assert_silent(&mut old_rx).await;
    assert_eq!(h.session.client().subscription_count(), 1);
}

/// After unsubscribe nothing is delivered, and removing a filter that
/// was never registered errors.
#[tokio::test]
async fn e2e_unsubscribe_stops_delivery() {
    let h = TestHarness::new();
    let client = h.session.client();
    let mut rx = h.subscribe("alerts").await;

    client.unsubscribe("alerts").await.unwrap();
    assert!(h.session.transport().unsubscribed().contains(&"alerts".to_string()));

    assert_eq!(h.session.inject("alerts", b"fire"), 0);
    assert_silent(&mut rx).await;

    let err = client.unsubscribe("alerts").await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound { .. }));
}

/// Oversized payloads are rejected locally, before any wire traffic.
#[tokio::test]
async fn e2e_oversized_payload_rejected() {
    let h = TestHarness::new();
    let client = h.session.client();

    let payload = vec![0u8; DEFAULT_MAX_PAYLOAD + 1];
    let err = client
        .publish("telemetry/blob", &payload, QoS::AtMostOnce)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::PayloadTooLarge { .. }));
    assert!(h.session.transport().published().is_empty());
}

/// Pub/sub is refused in every non-Connected state.
#[tokio::test]
async fn e2e_operations_require_connected() {
    let h = TestHarness::new();
    let client = h.session.client();

    for state in [
        SessionState::Disconnected,
        SessionState::Reconnecting,
        SessionState::ConnectionLost,
    ] {
        h.session.set_state(state);
        let err = client
            .publish("telemetry/temperature", b"21.5", QoS::AtMostOnce)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected), "state {state}");

        let err = client
            .subscribe("telemetry/#", QoS::AtMostOnce, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected), "state {state}");
    }
}
