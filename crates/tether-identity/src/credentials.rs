//! Ambient credentials for authorizing certificate-authority calls.
//!
//! The identity provider that vends these lives outside this crate;
//! callers hand in any `CredentialsProvider` implementation.

use async_trait::async_trait;

use crate::error::CredentialsError;

/// Credentials used to authorize provisioning calls.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bearer token presented to the authority.
    pub token: String,
}

/// Supplier of ambient credentials.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn get_credentials(&self) -> Result<Credentials, CredentialsError>;
}

/// Fixed credentials, for configuration-driven tokens and tests.
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn get_credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(Credentials {
            token: self.token.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_credentials_return_token() {
        let provider = StaticCredentials::new("session-token");
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.token, "session-token");
    }
}
