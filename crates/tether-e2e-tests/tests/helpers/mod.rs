//! Shared test harness for E2E integration tests.
//!
//! Bridges the identity flow and the session layer through the mock
//! transport, exercising real code paths across crate boundaries
//! without a broker or a real certificate authority.

#![allow(dead_code)] // not every test file uses every helper

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use tether_identity::{DeviceIdentity, FileKeystore, MockAuthority, Provisioner};
use tether_session::{InboundMessage, MockSession, QoS};

pub const PASSPHRASE: &str = "correct horse battery staple";
pub const POLICY: &str = "device-connect";

/// End-to-end harness: on-disk keystore + mock authority + mock session.
pub struct TestHarness {
    /// Encrypted keystore backed by a temp directory.
    pub keystore: FileKeystore,
    /// Provisioner over a mock authority that issues "abc123".
    pub provisioner: Provisioner<MockAuthority>,
    /// Mock session with loopback delivery enabled.
    pub session: MockSession,
    _dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            keystore: FileKeystore::new(dir.path(), "iot_keystore"),
            provisioner: Provisioner::new(MockAuthority::with_certificate_id("abc123")),
            session: MockSession::connected(),
            _dir: dir,
        }
    }

    /// Load-or-provision the identity for `alias` through the real
    /// bootstrap path.
    pub async fn identity(&self, alias: &str) -> DeviceIdentity {
        tether_device::ensure_identity(&self.keystore, &self.provisioner, alias, POLICY, PASSPHRASE)
            .await
            .unwrap()
    }

    /// Subscribe the session's client to `filter`, forwarding deliveries
    /// into a channel the test can await.
    pub async fn subscribe(&self, filter: &str) -> mpsc::UnboundedReceiver<InboundMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.session
            .client()
            .subscribe(filter, QoS::AtLeastOnce, move |msg| {
                let _ = tx.send(msg);
            })
            .await
            .unwrap();
        rx
    }
}

/// Receive one delivered message, or panic after a short deadline.
pub async fn recv_one(rx: &mut mpsc::UnboundedReceiver<InboundMessage>) -> InboundMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("handler channel closed")
}

/// Assert nothing is delivered within a short window.
pub async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<InboundMessage>) {
    let outcome = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected delivery: {outcome:?}");
}
