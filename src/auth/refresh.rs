//! Refresh token issuance, lookup and revocation
//!
//! Refresh tokens are opaque random strings tracked by the store. They live
//! for a fixed 60 days, are never rotated and can only be revoked once.

use crate::{
    error::{AppError, AuthFailure},
    models::auth::RefreshToken,
    repository::{self, Store, StoreError},
};
use chrono::{Duration as ChronoDuration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::{future::Future, sync::Arc, time::Duration};
use uuid::Uuid;

/// Lifetime of every refresh token
pub const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 60;

/// Random bytes per token (hex-encoded to twice as many characters)
pub const REFRESH_TOKEN_BYTES: usize = 32;

pub struct RefreshTokenManager {
    store: Arc<dyn Store>,
    store_timeout: Duration,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// 256 bits from the OS CSPRNG, hex-encoded
    pub fn generate() -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Generate and persist a new refresh token for `user_id`
    pub async fn create(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        let now = Utc::now();
        let token = Self::generate();
        let expires_at = now + ChronoDuration::days(REFRESH_TOKEN_LIFETIME_DAYS);

        self.with_deadline(self.store.create_refresh_token(&token, user_id, expires_at))
            .await
            .map_err(|e| {
                tracing::error!(%user_id, error = %e, "Failed to store refresh token");
                AppError::Storage(e)
            })?;

        tracing::debug!(%user_id, %expires_at, "Refresh token issued");

        Ok(RefreshToken {
            token,
            user_id,
            expires_at,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Owner of an active refresh token. The token is left untouched.
    pub async fn resolve_user(&self, token: &str) -> Result<Uuid, AppError> {
        self.with_deadline(self.store.get_user_id_by_refresh_token(token))
            .await
            .map_err(Self::classify)
    }

    /// Revoke a refresh token. Unknown and already-revoked tokens are rejected.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.with_deadline(self.store.revoke_refresh_token(token))
            .await
            .map_err(Self::classify)?;

        tracing::info!("Refresh token revoked");
        Ok(())
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        repository::with_deadline(self.store_timeout, fut).await
    }

    fn classify(e: StoreError) -> AppError {
        let failure = match e {
            StoreError::NotFound => AuthFailure::UnknownRefreshToken,
            StoreError::Revoked => AuthFailure::RevokedRefreshToken,
            StoreError::Expired => AuthFailure::ExpiredRefreshToken,
            other => return AppError::Storage(other),
        };

        tracing::debug!(reason = %failure, "Refresh token rejected");
        AppError::Unauthorized(failure)
    }
}
