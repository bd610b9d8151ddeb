//! In-memory store
//!
//! Same contract as `PgStore`, backed by maps behind one lock. Used by the
//! test suites and anywhere a database is not wanted.

use super::{Store, StoreError};
use crate::models::{
    auth::{RefreshToken, TokenStatus},
    chirp::{Chirp, SortOrder},
    user::{UpdateUserCredentials, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    // insertion order doubles as creation order
    chirps: Vec<Chirp>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw refresh token record, including revoked and expired ones.
    pub async fn refresh_token(&self, token: &str) -> Option<RefreshToken> {
        self.state.read().await.refresh_tokens.get(token).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user_credentials(
        &self,
        cmd: &UpdateUserCredentials,
    ) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if state
            .users
            .values()
            .any(|u| u.email == cmd.email && u.id != cmd.user_id)
        {
            return Err(StoreError::Conflict);
        }

        let user = state.users.get_mut(&cmd.user_id).ok_or(StoreError::NotFound)?;
        user.email = cmd.email.clone();
        user.hashed_password = cmd.hashed_password.clone();
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn upgrade_user_to_red(&self, user_id: Uuid) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_all_users(&self) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let removed = state.users.len() as u64;

        // 与数据库的 ON DELETE CASCADE 保持一致
        state.users.clear();
        state.refresh_tokens.clear();
        state.chirps.clear();

        Ok(removed)
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }
        if state.refresh_tokens.contains_key(token) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        state.refresh_tokens.insert(
            token.to_string(),
            RefreshToken {
                token: token.to_string(),
                user_id,
                expires_at,
                revoked_at: None,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(())
    }

    async fn get_user_id_by_refresh_token(&self, token: &str) -> Result<Uuid, StoreError> {
        let state = self.state.read().await;
        let record = state.refresh_tokens.get(token).ok_or(StoreError::NotFound)?;

        match record.status(Utc::now()) {
            TokenStatus::Active => Ok(record.user_id),
            TokenStatus::Revoked => Err(StoreError::Revoked),
            TokenStatus::Expired => Err(StoreError::Expired),
        }
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let record = state.refresh_tokens.get_mut(token).ok_or(StoreError::NotFound)?;

        if record.revoked_at.is_some() {
            return Err(StoreError::Revoked);
        }

        let now = Utc::now();
        record.revoked_at = Some(now);
        record.updated_at = now;

        Ok(())
    }

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> Result<Chirp, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        let now = Utc::now();
        let chirp = Chirp {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.to_string(),
            user_id,
        };
        state.chirps.push(chirp.clone());

        Ok(chirp)
    }

    async fn list_chirps(
        &self,
        author_id: Option<Uuid>,
        sort: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError> {
        let state = self.state.read().await;
        let mut chirps: Vec<Chirp> = state
            .chirps
            .iter()
            .filter(|c| author_id.map_or(true, |author| c.user_id == author))
            .cloned()
            .collect();

        if sort == SortOrder::Desc {
            chirps.reverse();
        }

        Ok(chirps)
    }

    async fn get_chirp(&self, chirp_id: Uuid) -> Result<Chirp, StoreError> {
        self.state
            .read()
            .await
            .chirps
            .iter()
            .find(|c| c.id == chirp_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_resource_owner(&self, chirp_id: Uuid) -> Result<Uuid, StoreError> {
        self.get_chirp(chirp_id).await.map(|c| c.user_id)
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let before = state.chirps.len();
        state.chirps.retain(|c| c.id != chirp_id);

        if state.chirps.len() == before {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user("a@b.com", "hash").await.unwrap();

        let result = store.create_user("a@b.com", "other").await;
        assert!(matches!(result, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.com", "hash").await.unwrap();

        store
            .create_refresh_token("live", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        store
            .create_refresh_token("stale", user.id, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(store.get_user_id_by_refresh_token("live").await.unwrap(), user.id);
        assert!(matches!(
            store.get_user_id_by_refresh_token("stale").await,
            Err(StoreError::Expired)
        ));
        assert!(matches!(
            store.get_user_id_by_refresh_token("missing").await,
            Err(StoreError::NotFound)
        ));

        store.revoke_refresh_token("live").await.unwrap();
        assert!(matches!(
            store.get_user_id_by_refresh_token("live").await,
            Err(StoreError::Revoked)
        ));
        assert!(matches!(store.revoke_refresh_token("live").await, Err(StoreError::Revoked)));
    }

    #[tokio::test]
    async fn test_revoked_at_written_once() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.com", "hash").await.unwrap();
        store
            .create_refresh_token("tok", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        store.revoke_refresh_token("tok").await.unwrap();
        let first = store.refresh_token("tok").await.unwrap().revoked_at;
        let _ = store.revoke_refresh_token("tok").await;
        let second = store.refresh_token("tok").await.unwrap().revoked_at;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_chirps_filter_and_sort() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice@example.com", "hash").await.unwrap();
        let bob = store.create_user("bob@example.com", "hash").await.unwrap();

        let first = store.create_chirp("one", alice.id).await.unwrap();
        store.create_chirp("two", bob.id).await.unwrap();
        let third = store.create_chirp("three", alice.id).await.unwrap();

        let all = store.list_chirps(None, SortOrder::Asc).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_alice = store.list_chirps(Some(alice.id), SortOrder::Desc).await.unwrap();
        assert_eq!(
            by_alice.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![third.id, first.id]
        );
    }

    #[tokio::test]
    async fn test_delete_all_users_cascades() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.com", "hash").await.unwrap();
        store.create_chirp("hello", user.id).await.unwrap();
        store
            .create_refresh_token("tok", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(store.delete_all_users().await.unwrap(), 1);
        assert_eq!(store.user_count().await, 0);
        assert!(store.refresh_token("tok").await.is_none());
        assert!(store.list_chirps(None, SortOrder::Asc).await.unwrap().is_empty());
    }
}
