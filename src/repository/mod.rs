//! Database repository layer
//!
//! `Store` is the whole persistence contract the service depends on. Handlers
//! and auth components hold an `Arc<dyn Store>` and never see SQL.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{DbError, PgStore};

use crate::models::{
    chirp::{Chirp, SortOrder},
    user::{UpdateUserCredentials, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{future::Future, time::Duration};
use thiserror::Error;
use uuid::Uuid;

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("refresh token expired")]
    Expired,

    #[error("refresh token revoked")]
    Revoked,

    #[error("store call exceeded its deadline")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    // ==================== Users ====================

    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn update_user_credentials(
        &self,
        cmd: &UpdateUserCredentials,
    ) -> Result<User, StoreError>;

    async fn upgrade_user_to_red(&self, user_id: Uuid) -> Result<User, StoreError>;

    /// Removes every user (and, by cascade, their chirps and tokens).
    async fn delete_all_users(&self) -> Result<u64, StoreError>;

    // ==================== Refresh Tokens ====================

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Owner of an active token. `NotFound`, `Revoked` or `Expired` otherwise.
    async fn get_user_id_by_refresh_token(&self, token: &str) -> Result<Uuid, StoreError>;

    /// Marks the token revoked. `NotFound` if unknown, `Revoked` if it already was.
    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StoreError>;

    // ==================== Chirps ====================

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> Result<Chirp, StoreError>;

    async fn list_chirps(
        &self,
        author_id: Option<Uuid>,
        sort: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError>;

    async fn get_chirp(&self, chirp_id: Uuid) -> Result<Chirp, StoreError>;

    async fn get_resource_owner(&self, chirp_id: Uuid) -> Result<Uuid, StoreError>;

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), StoreError>;
}

/// Bound a store call by `timeout`. Dropping the returned future (client gone)
/// drops the store call with it.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout)
        }
    }
}
