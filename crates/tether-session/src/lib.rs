//! Secure MQTT session management for Tether.
//!
//! Owns one TLS+MQTT session authenticated with a `DeviceIdentity`:
//! - `SessionManager`: connect/disconnect/reconnect lifecycle with a
//!   `SessionState` machine and status events
//! - `PubSubClient`: subscribe/unsubscribe/publish facade with
//!   per-topic callback dispatch
//! - `Transport` trait for the wire (mockable in tests)
//! - `MockTransport` / `MockSession` for testing without a broker

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod session;
pub mod state;
pub mod subscriptions;
pub mod transport;

// Re-exports for convenience.
pub use client::PubSubClient;
pub use config::{ConnectionConfig, LastWillConfig, DEFAULT_MAX_PAYLOAD};
pub use error::{SessionError, SessionResult};
pub use mock::{MockSession, MockTransport, PublishedMessage};
pub use rumqttc::QoS;
pub use session::SessionManager;
pub use state::{SessionState, StatusEvent};
pub use subscriptions::{InboundMessage, MessageHandler, SubscriptionTable};
pub use transport::{MqttTransport, Transport};
