use chrono::{DateTime, Utc};
use error_stack::ResultExt;
use tracing::instrument;

use crate::{
    domain::credential::{Credential, CredentialState},
    ports::{
        credentials::{CredentialStore, OAuthFlow},
        report_sink::AuthError,
    },
};

/// Drives the credential cache to an authenticated credential.
///
/// - cached and valid: returned as is, nothing is written
/// - cached and expired with a refresh token: refreshed and re-cached
/// - anything else: interactive login, then cached
///
/// A refresh failure is returned as is; it does not fall back to a login.
#[instrument(skip_all)]
pub async fn authenticate(
    store: &dyn CredentialStore,
    flow: &dyn OAuthFlow,
    now: DateTime<Utc>,
) -> error_stack::Result<Credential, AuthError> {
    let cached = match store.load() {
        Ok(cached) => cached,
        Err(report) => {
            tracing::warn!("⚠️  Ignoring unreadable credential cache: {:?}", report);
            None
        }
    };

    let credential = match CredentialState::classify(cached, now) {
        CredentialState::CachedValid(credential) => {
            tracing::trace!("🔑 Using cached credential");
            return Ok(credential);
        }
        CredentialState::CachedExpired {
            credential,
            refresh_token,
        } => {
            tracing::info!("🔄 Cached credential expired, refreshing");
            let refreshed = flow.refresh(&refresh_token).await?;
            credential.merge_refreshed(refreshed)
        }
        CredentialState::NoToken => {
            tracing::info!("🌐 No usable credential cached, starting interactive login");
            flow.login().await?
        }
    };

    store
        .save(&credential)
        .change_context(AuthError::Cache)?;
    tracing::trace!("💾 Credential cached");

    Ok(credential)
}
