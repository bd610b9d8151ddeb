//! 认证服务：注册、登录、令牌刷新与撤销、凭据更新、会员升级

use crate::{
    auth::{guard::AuthGuard, password::PasswordHasher},
    error::AppError,
    models::{
        auth::{LoginRequest, LoginResponse, PolkaWebhookRequest, RefreshResponse, USER_UPGRADED_EVENT},
        user::{CreateUserRequest, UpdateUserCredentials, UpdateUserRequest, UserResponse},
    },
    repository::{self, Store, StoreError},
};
use axum::http::HeaderMap;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

/// Outcome of a payment webhook delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Upgraded,
    Ignored,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    guard: Arc<AuthGuard>,
    store_timeout: Duration,
    allow_reset: bool,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: PasswordHasher,
        guard: Arc<AuthGuard>,
        store_timeout: Duration,
        allow_reset: bool,
    ) -> Self {
        Self {
            store,
            hasher,
            guard,
            store_timeout,
            allow_reset,
        }
    }

    /// 注册新用户
    pub async fn register(&self, req: CreateUserRequest) -> Result<UserResponse, AppError> {
        validate_credentials(&req.email, &req.password)?;

        let hashed = self.hasher.hash_async(req.password).await?;

        let user = repository::with_deadline(
            self.store_timeout,
            self.store.create_user(&req.email, &hashed),
        )
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::malformed("Email already registered"),
            other => AppError::Storage(other),
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(UserResponse::from(user))
    }

    /// 用户登录
    ///
    /// Unknown email and wrong password fail identically, after the same
    /// amount of hashing work.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let lookup = repository::with_deadline(
            self.store_timeout,
            self.store.get_user_by_email(&req.email),
        )
        .await;

        let user = match lookup {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.hasher.verify_dummy_async(req.password).await?;
                tracing::debug!("Login for unknown email");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(AppError::Storage(e)),
        };

        let matches = self
            .hasher
            .verify_async(req.password, user.hashed_password.clone())
            .await?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let ttl = self.guard.session_ttl(req.expires_in_seconds);
        let token = self.guard.sessions().issue(user.id, ttl)?;
        let refresh_token = self.guard.refresh_tokens().create(user.id).await?;

        tracing::info!(user_id = %user.id, ttl_secs = ttl.as_secs(), "User logged in");
        Ok(LoginResponse::new(user, token, refresh_token.token))
    }

    /// 用刷新令牌换取新的会话令牌（刷新令牌本身不变）
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<RefreshResponse, AppError> {
        let user_id = self.guard.authenticate_refresh(headers).await?;
        let token = self
            .guard
            .sessions()
            .issue(user_id, self.guard.default_session_ttl())?;

        tracing::debug!(%user_id, "Session token refreshed");
        Ok(RefreshResponse { token })
    }

    /// 撤销刷新令牌
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = self.guard.refresh_credential(headers)?;
        self.guard.refresh_tokens().revoke(&token).await
    }

    /// 更新当前用户的邮箱和密码
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        validate_credentials(&req.email, &req.password)?;

        let hashed = self.hasher.hash_async(req.password.clone()).await?;
        let cmd = UpdateUserCredentials::new(user_id, req, hashed);

        let user = repository::with_deadline(
            self.store_timeout,
            self.store.update_user_credentials(&cmd),
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("User"),
            StoreError::Conflict => AppError::malformed("Email already registered"),
            other => AppError::Storage(other),
        })?;

        tracing::info!(%user_id, "User credentials updated");
        Ok(UserResponse::from(user))
    }

    /// 处理支付回调；调用方已完成 API Key 校验
    pub async fn handle_webhook(&self, req: PolkaWebhookRequest) -> Result<WebhookOutcome, AppError> {
        if req.event != USER_UPGRADED_EVENT {
            tracing::debug!(event = %req.event, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        let user_id = req.data.user_id;
        repository::with_deadline(self.store_timeout, self.store.upgrade_user_to_red(user_id))
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::not_found("User"),
                other => AppError::Storage(other),
            })?;

        tracing::info!(%user_id, "User upgraded to Chirpy Red");
        Ok(WebhookOutcome::Upgraded)
    }

    /// 清空所有用户（仅开发环境）
    pub async fn reset(&self) -> Result<u64, AppError> {
        if !self.allow_reset {
            tracing::warn!("Reset requested outside the dev platform");
            return Err(AppError::Forbidden);
        }

        let removed =
            repository::with_deadline(self.store_timeout, self.store.delete_all_users()).await?;

        tracing::warn!(removed, "All users deleted");
        Ok(removed)
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        return Err(AppError::malformed("Email is required"));
    }
    if password.is_empty() {
        return Err(AppError::malformed("Password is required"));
    }
    Ok(())
}
