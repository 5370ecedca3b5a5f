use thiserror::Error;

use crate::domain::credential::Credential;

use super::report_sink::AuthError;

#[derive(Error, Debug)]
pub enum CredentialStoreError {
    #[error("Failed to read the credential cache")]
    Read,
    #[error("Failed to write the credential cache")]
    Write,
}

pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing has been cached yet.
    fn load(&self) -> error_stack::Result<Option<Credential>, CredentialStoreError>;

    fn save(&self, credential: &Credential) -> error_stack::Result<(), CredentialStoreError>;
}

#[async_trait::async_trait]
pub trait OAuthFlow: Send + Sync {
    /// Runs the interactive consent flow.
    async fn login(&self) -> error_stack::Result<Credential, AuthError>;

    /// Exchanges a refresh token for a new access token without user
    /// interaction.
    async fn refresh(&self, refresh_token: &str) -> error_stack::Result<Credential, AuthError>;
}
