//! PostgreSQL store (数据库访问层)

use super::{Store, StoreError};
use crate::models::{
    auth::{RefreshToken, TokenStatus},
    chirp::{Chirp, SortOrder},
    user::{UpdateUserCredentials, User},
};
use crate::config::DatabaseConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

/// 启动阶段的数据库错误
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 按配置建立连接池并执行迁移，返回可直接使用的存储
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        tracing::debug!("Connecting chirpy store...");

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(config.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Store connection failed");
                DbError::ConnectionFailed(e.to_string())
            })?;

        let store = Self::new(db);
        store.migrate().await?;

        tracing::info!(
            max_connections = config.max_connections,
            store_timeout_secs = config.store_timeout_secs,
            "Chirpy store ready"
        );

        Ok(store)
    }

    /// users / chirps / refresh_tokens 三张表的迁移
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Schema migration failed");
                DbError::MigrationFailed(e.to_string())
            })
    }

    /// 底层连接池（测试清理数据用）
    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

/// 唯一约束冲突映射为 Conflict
fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    // ==================== Users ====================

    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn update_user_credentials(
        &self,
        cmd: &UpdateUserCredentials,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                email = $2,
                hashed_password = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(cmd.user_id)
        .bind(&cmd.email)
        .bind(&cmd.hashed_password)
        .fetch_optional(&self.db)
        .await
        .map_err(map_insert_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn upgrade_user_to_red(&self, user_id: Uuid) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                is_chirpy_red = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_all_users(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.db).await?;

        Ok(result.rows_affected())
    }

    // ==================== Refresh Tokens ====================

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at, revoked_at, created_at, updated_at)
            VALUES ($1, $2, $3, NULL, NOW(), NOW())
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn get_user_id_by_refresh_token(&self, token: &str) -> Result<Uuid, StoreError> {
        let record = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;

        match record.status(Utc::now()) {
            TokenStatus::Active => Ok(record.user_id),
            TokenStatus::Revoked => Err(StoreError::Revoked),
            TokenStatus::Expired => Err(StoreError::Expired),
        }
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        // revoked_at 只写一次，并发撤销时只有一个调用成功
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET
                revoked_at = NOW(),
                updated_at = NOW()
            WHERE token = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token)
        .execute(&self.db)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM refresh_tokens WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.db)
                .await?;

        if exists {
            Err(StoreError::Revoked)
        } else {
            Err(StoreError::NotFound)
        }
    }

    // ==================== Chirps ====================

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> Result<Chirp, StoreError> {
        let chirp = sqlx::query_as::<_, Chirp>(
            r#"
            INSERT INTO chirps (id, body, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(body)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(chirp)
    }

    async fn list_chirps(
        &self,
        author_id: Option<Uuid>,
        sort: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError> {
        let sql = match sort {
            SortOrder::Asc => {
                "SELECT * FROM chirps WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at ASC"
            }
            SortOrder::Desc => {
                "SELECT * FROM chirps WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC"
            }
        };

        let chirps = sqlx::query_as::<_, Chirp>(sql)
            .bind(author_id)
            .fetch_all(&self.db)
            .await?;

        Ok(chirps)
    }

    async fn get_chirp(&self, chirp_id: Uuid) -> Result<Chirp, StoreError> {
        sqlx::query_as::<_, Chirp>("SELECT * FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_resource_owner(&self, chirp_id: Uuid) -> Result<Uuid, StoreError> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
