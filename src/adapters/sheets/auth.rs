use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use error_stack::{report, ResultExt};
use google_sheets4::oauth2::{
    self,
    storage::{TokenInfo, TokenStorage},
    ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    domain::credential::Credential,
    ports::{credentials::OAuthFlow, report_sink::AuthError},
};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Token storage that never returns anything, so the authenticator always
/// runs the consent flow, and that keeps whatever token the flow produced.
#[derive(Clone, Default)]
struct CapturedToken(Arc<Mutex<Option<TokenInfo>>>);

impl CapturedToken {
    fn refresh_token(&self) -> Option<String> {
        self.0
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(|info| info.refresh_token.clone()))
    }
}

#[async_trait::async_trait]
impl TokenStorage for CapturedToken {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("captured token slot poisoned"))?;
        *slot = Some(token);
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        None
    }
}

#[derive(Deserialize, Debug)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl RefreshResponse {
    fn into_credential(self, now: DateTime<Utc>) -> Credential {
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// OAuth "installed application" flow for a desktop client secret.
///
/// The client secret is only read when a login or refresh is actually needed.
pub struct InstalledAppFlow {
    client_secret_path: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for InstalledAppFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "InstalledAppFlow {{ client_secret_path: {:?} }}",
            self.client_secret_path
        )
    }
}

impl InstalledAppFlow {
    pub fn new(client_secret_path: impl Into<String>) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn secret(&self) -> error_stack::Result<ApplicationSecret, AuthError> {
        oauth2::read_application_secret(&self.client_secret_path)
            .await
            .change_context(AuthError::ClientSecret)
            .attach_printable_lazy(|| {
                format!(
                    "Could not read OAuth client secret at '{}'. Download the desktop client JSON from the Google Cloud console.",
                    self.client_secret_path
                )
            })
    }
}

#[async_trait::async_trait]
impl OAuthFlow for InstalledAppFlow {
    /// Listens on an ephemeral local port for the redirect while the user
    /// completes consent in the browser.
    #[instrument]
    async fn login(&self) -> error_stack::Result<Credential, AuthError> {
        let secret = self.secret().await?;
        let captured = CapturedToken::default();

        let authenticator =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                .with_storage(Box::new(captured.clone()))
                .build()
                .await
                .change_context(AuthError::Login)?;

        let token = authenticator
            .token(&[SPREADSHEETS_SCOPE])
            .await
            .change_context(AuthError::Login)?;

        let access_token = token
            .token()
            .ok_or(report!(AuthError::Login))
            .attach_printable("Login completed without an access token")?;

        Ok(Credential {
            access_token: access_token.to_string(),
            refresh_token: captured.refresh_token(),
            expires_at: token
                .expiration_time()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0)),
        })
    }

    #[instrument(skip(refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> error_stack::Result<Credential, AuthError> {
        let secret = self.secret().await?;

        let response = self
            .http
            .post(&secret.token_uri)
            .form(&[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .change_context(AuthError::Refresh)?
            .error_for_status()
            .change_context(AuthError::Refresh)
            .attach_printable_lazy(|| format!("Token endpoint: {}", secret.token_uri))?
            .json::<RefreshResponse>()
            .await
            .change_context(AuthError::Refresh)?;

        Ok(response.into_credential(Utc::now()))
    }
}
