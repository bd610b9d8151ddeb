//! 支付回调处理器

use crate::{error::AppError, middleware::AppState, models::auth::PolkaWebhookRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Polka 回调
///
/// API Key 先于请求体校验；无关事件同样返回 204
pub async fn polka_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PolkaWebhookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    state.guard.authenticate_api_key(&headers)?;

    let Json(req) = payload?;
    state.auth_service.handle_webhook(req).await?;

    Ok(StatusCode::NO_CONTENT)
}
