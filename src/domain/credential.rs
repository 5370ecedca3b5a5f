use chrono::{DateTime, Duration, Utc};
use error_stack::ResultExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tokens are treated as expired this long before their actual expiry, so a
/// token is never handed out right before it stops working.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Error, Debug)]
pub enum CredentialCodecError {
    #[error("Failed to encode credential")]
    Encode,
    #[error("Failed to decode credential")]
    Decode,
}

/// OAuth access/refresh token pair as persisted in the credential cache.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn encode(&self) -> error_stack::Result<Vec<u8>, CredentialCodecError> {
        serde_json::to_vec_pretty(self).change_context(CredentialCodecError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> error_stack::Result<Self, CredentialCodecError> {
        serde_json::from_slice(bytes).change_context(CredentialCodecError::Decode)
    }

    /// A credential without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expires_at,
        }
    }

    /// Token endpoints usually omit the refresh token on refresh; keep the one
    /// we already have in that case.
    pub fn merge_refreshed(self, refreshed: Credential) -> Credential {
        Credential {
            refresh_token: refreshed.refresh_token.or(self.refresh_token),
            ..refreshed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    NoToken,
    CachedValid(Credential),
    CachedExpired {
        credential: Credential,
        refresh_token: String,
    },
}

impl CredentialState {
    pub fn classify(cached: Option<Credential>, now: DateTime<Utc>) -> Self {
        match cached {
            None => CredentialState::NoToken,
            Some(credential) if !credential.is_expired(now) => {
                CredentialState::CachedValid(credential)
            }
            Some(credential) => match credential.refresh_token.clone() {
                Some(refresh_token) => CredentialState::CachedExpired {
                    credential,
                    refresh_token,
                },
                None => CredentialState::NoToken,
            },
        }
    }
}
