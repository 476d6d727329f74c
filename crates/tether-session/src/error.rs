//! Session and facade error types.

use thiserror::Error;

/// Errors from the session manager and pub/sub facade.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `connect` was called with no identity supplied and none cached.
    #[error("no device identity supplied or cached")]
    NoIdentity,

    /// `connect` was called while a session is already active.
    #[error("session already active; disconnect first")]
    AlreadyConnected,

    /// The broker rejected authentication (bad certificate, policy not
    /// attached). Not retried; the same identity cannot succeed.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// Transport-level failure (network, TLS plumbing, client queue).
    #[error("transport error: {0}")]
    Transport(String),

    /// An operation did not complete within its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The operation requires a Connected session.
    #[error("not connected")]
    NotConnected,

    /// No subscription registered for the topic filter.
    #[error("no subscription for filter '{filter}'")]
    NotFound { filter: String },

    /// Payload exceeds the configured maximum.
    #[error("payload of {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Invalid connection configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
