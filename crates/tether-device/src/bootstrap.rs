//! Store-first identity flow and session wiring.
//!
//! The keystore is consulted first; only a miss invokes the
//! provisioner, and its result is written back before the session
//! manager is allowed to connect. Keystore errors other than a plain
//! miss surface to the caller; a corrupt container is never silently
//! re-provisioned over.

use thiserror::Error;

use tether_identity::{
    CertificateAuthority, DeviceIdentity, FileKeystore, KeystoreError, Provisioner,
    ProvisioningError,
};
use tether_session::{SessionError, SessionManager};

use crate::config::DeviceConfig;

/// Errors from the bootstrap flow.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Load the identity for `alias`, provisioning and persisting a new
/// one on a keystore miss.
pub async fn ensure_identity<A: CertificateAuthority>(
    keystore: &FileKeystore,
    provisioner: &Provisioner<A>,
    alias: &str,
    policy_name: &str,
    passphrase: &str,
) -> Result<DeviceIdentity, BootstrapError> {
    if keystore.has_identity(alias) {
        tracing::info!(alias = %alias, "identity found in keystore; using for session");
        return Ok(keystore.load(alias, passphrase)?);
    }

    tracing::info!(alias = %alias, "no identity in keystore; provisioning a new one");
    let identity = provisioner.issue_identity(alias, policy_name).await?;
    keystore.save(alias, &identity, passphrase)?;
    Ok(identity)
}

/// Full bootstrap: ensure an identity exists, then connect with it.
///
/// Returns the session manager; use `manager.client()` for pub/sub and
/// `manager.status_events()` to observe the connection.
pub async fn connect_device<A: CertificateAuthority>(
    config: &DeviceConfig,
    authority: A,
) -> Result<SessionManager, BootstrapError> {
    let keystore = FileKeystore::new(&config.keystore_dir, &config.keystore_name);
    let provisioner = Provisioner::new(authority);

    let identity = ensure_identity(
        &keystore,
        &provisioner,
        &config.alias,
        &config.policy_name,
        &config.passphrase,
    )
    .await?;

    let manager = SessionManager::new(config.mqtt.clone())?;
    manager.connect_with(identity).await?;
    Ok(manager)
}
