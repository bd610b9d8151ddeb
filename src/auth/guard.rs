//! Request authentication and ownership checks

use crate::{
    auth::{
        credentials::{extract_credential, AuthScheme, Credential, SchemeMatching},
        jwt::SessionTokenCodec,
        refresh::RefreshTokenManager,
    },
    config::AppConfig,
    error::{AppError, AuthFailure},
};
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

pub struct AuthGuard {
    sessions: Arc<SessionTokenCodec>,
    refresh_tokens: Arc<RefreshTokenManager>,
    api_key: Secret<String>,
    matching: SchemeMatching,
    default_session_ttl: Duration,
}

impl AuthGuard {
    pub fn new(
        config: &AppConfig,
        sessions: Arc<SessionTokenCodec>,
        refresh_tokens: Arc<RefreshTokenManager>,
    ) -> Self {
        Self {
            sessions,
            refresh_tokens,
            api_key: config.security.polka_key.clone(),
            matching: SchemeMatching::from_strict(config.security.strict_authorization_scheme),
            default_session_ttl: Duration::from_secs(config.security.session_token_exp_secs),
        }
    }

    fn credential(&self, headers: &HeaderMap, scheme: AuthScheme) -> Result<Credential, AppError> {
        extract_credential(headers, scheme, self.matching).inspect_err(|_| {
            tracing::debug!(scheme = ?scheme, "No matching Authorization credential");
        })
    }

    /// Bearer session token -> user id
    pub fn authenticate_session(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let credential = self.credential(headers, AuthScheme::Bearer)?;
        let scheme = credential.scheme();

        self.sessions.validate(&credential.into_value()).inspect_err(|e| {
            tracing::debug!(scheme = ?scheme, error = %e, "Session credential rejected");
        })
    }

    /// Bearer refresh token -> user id
    pub async fn authenticate_refresh(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let token = self.refresh_credential(headers)?;
        self.refresh_tokens.resolve_user(&token).await
    }

    /// Bearer refresh token, returned raw for revocation
    pub fn refresh_credential(&self, headers: &HeaderMap) -> Result<String, AppError> {
        self.credential(headers, AuthScheme::Bearer).map(Credential::into_value)
    }

    /// ApiKey credential must equal the configured key
    pub fn authenticate_api_key(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let credential = self.credential(headers, AuthScheme::ApiKey)?;
        let scheme = credential.scheme();
        let presented = credential.into_value();

        if constant_time_eq(presented.as_bytes(), self.api_key.expose_secret().as_bytes()) {
            Ok(())
        } else {
            tracing::warn!(scheme = ?scheme, "Webhook called with a wrong API key");
            Err(AppError::Unauthorized(AuthFailure::ApiKeyMismatch))
        }
    }

    /// Only the owner may mutate a resource
    pub fn authorize_owner(user_id: Uuid, owner_id: Uuid) -> Result<(), AppError> {
        if user_id == owner_id {
            Ok(())
        } else {
            tracing::debug!(%user_id, %owner_id, "Ownership check failed");
            Err(AppError::Forbidden)
        }
    }

    /// Session lifetime for a caller-requested number of seconds. The configured
    /// lifetime is both the default and the cap; absent, zero, negative or
    /// over-cap requests get it.
    pub fn session_ttl(&self, requested_secs: Option<i64>) -> Duration {
        let cap = self.default_session_ttl.as_secs();
        match requested_secs {
            Some(secs) if secs > 0 && (secs as u64) <= cap => {
                Duration::from_secs(secs as u64)
            }
            _ => self.default_session_ttl,
        }
    }

    /// Lifetime used when minting from a refresh token
    pub fn default_session_ttl(&self) -> Duration {
        self.default_session_ttl
    }

    pub fn sessions(&self) -> &SessionTokenCodec {
        &self.sessions
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenManager {
        &self.refresh_tokens
    }
}

/// Compare digests so the running time does not depend on where inputs differ
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let a = Sha256::digest(a);
    let b = Sha256::digest(b);

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
