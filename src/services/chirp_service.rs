//! Chirp 服务：发布、查询、删除

use crate::{
    auth::guard::AuthGuard,
    error::AppError,
    models::chirp::{Chirp, CreateChirpRequest, ListChirpsQuery, MAX_CHIRP_LENGTH},
    repository::{self, Store, StoreError},
};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

pub struct ChirpService {
    store: Arc<dyn Store>,
    store_timeout: Duration,
}

impl ChirpService {
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// 发布 chirp
    pub async fn create(&self, user_id: Uuid, req: CreateChirpRequest) -> Result<Chirp, AppError> {
        if req.body.len() > MAX_CHIRP_LENGTH {
            return Err(AppError::malformed("Chirp is too long"));
        }

        let chirp =
            repository::with_deadline(self.store_timeout, self.store.create_chirp(&req.body, user_id))
                .await?;

        tracing::info!(chirp_id = %chirp.id, %user_id, "Chirp created");
        Ok(chirp)
    }

    pub async fn list(&self, query: ListChirpsQuery) -> Result<Vec<Chirp>, AppError> {
        let chirps = repository::with_deadline(
            self.store_timeout,
            self.store.list_chirps(query.author_id, query.sort),
        )
        .await?;

        Ok(chirps)
    }

    pub async fn get(&self, chirp_id: Uuid) -> Result<Chirp, AppError> {
        repository::with_deadline(self.store_timeout, self.store.get_chirp(chirp_id))
            .await
            .map_err(chirp_not_found)
    }

    /// 删除 chirp，只有作者本人可以删除
    pub async fn delete(&self, user_id: Uuid, chirp_id: Uuid) -> Result<(), AppError> {
        let owner_id =
            repository::with_deadline(self.store_timeout, self.store.get_resource_owner(chirp_id))
                .await
                .map_err(chirp_not_found)?;

        AuthGuard::authorize_owner(user_id, owner_id)?;

        repository::with_deadline(self.store_timeout, self.store.delete_chirp(chirp_id))
            .await
            .map_err(chirp_not_found)?;

        tracing::info!(%chirp_id, %user_id, "Chirp deleted");
        Ok(())
    }
}

fn chirp_not_found(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::not_found("Chirp"),
        other => AppError::Storage(other),
    }
}
