//! 管理端点

use crate::{error::AppError, middleware::AppState};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// 重置数据（仅开发环境）
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let removed = state.auth_service.reset().await?;

    Ok(Json(json!({ "deleted_users": removed })))
}
