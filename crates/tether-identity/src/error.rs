//! Identity, keystore, and provisioning error types.

use thiserror::Error;

/// Errors from the durable key/certificate store.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// No identity exists for the alias (container missing or holds
    /// a different alias).
    #[error("no identity found for alias '{alias}'")]
    NotFound { alias: String },

    /// The stored material could not be parsed or decrypted with the
    /// given passphrase. A wrong passphrase always lands here; AEAD
    /// authentication fails before any plaintext is produced.
    #[error("keystore record for alias '{alias}' is corrupt or the passphrase is wrong")]
    Corrupt { alias: String },

    /// Durable storage failed (I/O, permissions, rename).
    #[error("keystore storage error: {0}")]
    Storage(String),
}

/// Errors from the ambient credentials supplier.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("credentials unavailable: {0}")]
    Unavailable(String),

    #[error("credentials expired")]
    Expired,
}

/// Errors from the certificate-issuing authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// Could not authorize the call (credential supplier failed).
    #[error("authority auth error: {0}")]
    Auth(#[from] CredentialsError),

    /// Transport-level failure reaching the authority.
    #[error("authority request failed: {0}")]
    Http(String),

    /// The authority answered with a non-success status.
    #[error("authority returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The authority's response could not be decoded.
    #[error("authority response decode error: {0}")]
    Decode(String),
}

/// Errors from identity provisioning.
///
/// `PolicyAttach` is the partial-failure case: the certificate was
/// issued but the policy could not be bound to it. The orphaned
/// `certificate_id` is carried so the caller can retry the attachment
/// or clean up out of band; nothing is deleted automatically.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("certificate issuance failed: {0}")]
    Issue(#[source] AuthorityError),

    #[error("policy '{policy_name}' attach failed for certificate '{certificate_id}': {source}")]
    PolicyAttach {
        policy_name: String,
        certificate_id: String,
        source: AuthorityError,
    },
}

impl ProvisioningError {
    /// The certificate id orphaned by a partial failure, if any.
    pub fn partial(&self) -> Option<&str> {
        match self {
            Self::PolicyAttach { certificate_id, .. } => Some(certificate_id),
            Self::Issue(_) => None,
        }
    }
}
