//! Session state machine vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection lifecycle state of a session manager.
///
/// Mutated only by the session driver; observable through the status
/// event stream and `SessionManager::state()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session; `connect` may be called.
    Disconnected,
    /// TLS handshake + MQTT CONNECT in flight.
    Connecting,
    /// CONNACK accepted; pub/sub operations available.
    Connected,
    /// Automatic retry after a lost connection, with backoff.
    Reconnecting,
    /// Established session dropped without the caller asking.
    ConnectionLost,
    /// Authentication rejected; no automatic retry.
    TerminallyFailed,
}

impl SessionState {
    /// True while a driver task owns the connection lifecycle.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::Reconnecting | Self::ConnectionLost
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::ConnectionLost => "connection_lost",
            Self::TerminallyFailed => "terminally_failed",
        };
        f.write_str(s)
    }
}

/// One state transition, delivered to status observers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub state: SessionState,
    /// Error that caused the transition, if any.
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}
