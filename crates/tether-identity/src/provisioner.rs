//! Identity provisioning against the certificate authority.
//!
//! Two sub-steps: issue a key pair + certificate, then bind the named
//! access policy to the new certificate's principal. Both must succeed.
//! No internal retries; the caller owns retry policy so failure
//! semantics stay explicit.

use crate::authority::CertificateAuthority;
use crate::error::ProvisioningError;
use crate::identity::DeviceIdentity;

/// Provisions new device identities through a `CertificateAuthority`.
pub struct Provisioner<A: CertificateAuthority> {
    authority: A,
}

impl<A: CertificateAuthority> Provisioner<A> {
    pub fn new(authority: A) -> Self {
        Self { authority }
    }

    /// Access the underlying authority (useful for mock assertions).
    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Issue a new identity and attach `policy_name` to it.
    ///
    /// If the policy attach fails after issuance succeeded, the error
    /// carries the orphaned certificate id; the certificate is left in
    /// place rather than deleted on an ambiguous failure.
    pub async fn issue_identity(
        &self,
        alias: &str,
        policy_name: &str,
    ) -> Result<DeviceIdentity, ProvisioningError> {
        let issued = self
            .authority
            .issue_certificate()
            .await
            .map_err(ProvisioningError::Issue)?;

        tracing::info!(
            alias = %alias,
            certificate_id = %issued.certificate_id,
            "certificate issued"
        );

        if let Err(e) = self
            .authority
            .attach_policy(policy_name, &issued.certificate_arn)
            .await
        {
            tracing::warn!(
                alias = %alias,
                policy_name = %policy_name,
                certificate_id = %issued.certificate_id,
                error = %e,
                "policy attach failed; certificate left orphaned for manual cleanup"
            );
            return Err(ProvisioningError::PolicyAttach {
                policy_name: policy_name.to_string(),
                certificate_id: issued.certificate_id,
                source: e,
            });
        }

        tracing::info!(
            alias = %alias,
            policy_name = %policy_name,
            certificate_id = %issued.certificate_id,
            "policy attached"
        );

        Ok(DeviceIdentity::new(
            alias,
            issued.certificate_id,
            issued.certificate_pem.into_bytes(),
            issued.private_key_pem.into_bytes(),
        ))
    }
}
