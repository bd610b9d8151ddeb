//! 统一错误模型
//! 定义所有错误类型和错误响应格式
//!
//! 认证失败的具体原因（签名错误、过期、撤销……）只记录在 `AuthFailure` 中
//! 并写入日志，对客户端统一返回 401。

use crate::repository::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 认证失败的内部原因（仅用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("session token expired")]
    Expired,

    #[error("malformed session token")]
    MalformedToken,

    #[error("token subject is not a valid user id")]
    MalformedSubject,

    #[error("unknown refresh token")]
    UnknownRefreshToken,

    #[error("refresh token revoked")]
    RevokedRefreshToken,

    #[error("refresh token expired")]
    ExpiredRefreshToken,

    #[error("api key mismatch")]
    ApiKeyMismatch,
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication failed: {0}")]
    Unauthorized(AuthFailure),

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredential
            | AppError::InvalidCredentials
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_)
            | AppError::Hashing(_)
            | AppError::Signing(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::MissingCredential | AppError::Unauthorized(_) => "Unauthorized".to_string(),
            AppError::InvalidCredentials => "Incorrect email or password".to_string(),
            AppError::Forbidden => "Forbidden".to_string(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::MalformedRequest(msg) => msg.clone(),
            AppError::Storage(_)
            | AppError::Hashing(_)
            | AppError::Signing(_)
            | AppError::Config(_) => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(what.to_string())
    }

    pub fn malformed(msg: &str) -> Self {
        AppError::MalformedRequest(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        // 客户端错误记 warn，服务端错误记 error；两者都带内部原因
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        } else {
            tracing::warn!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 请求体无法解析时返回 400
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::MalformedRequest("Invalid request body".to_string())
    }
}
