//! Device identity management for Tether.
//!
//! Provides the pieces a device needs before it can open an
//! authenticated MQTT session:
//! - `DeviceIdentity`: private key + certificate chain under an alias
//! - `FileKeystore`: passphrase-encrypted, single-alias durable store
//! - `Provisioner`: obtains a fresh identity from a certificate
//!   authority and binds an access policy to it
//! - `CertificateAuthority` / `CredentialsProvider` traits for the
//!   external collaborators (mockable in tests)

pub mod authority;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod keystore;
pub mod provisioner;

// Re-exports for convenience.
pub use authority::{CertificateAuthority, HttpCertificateAuthority, IssuedCertificate, MockAuthority};
pub use credentials::{Credentials, CredentialsProvider, StaticCredentials};
pub use error::{AuthorityError, CredentialsError, KeystoreError, ProvisioningError};
pub use identity::DeviceIdentity;
pub use keystore::FileKeystore;
pub use provisioner::Provisioner;
