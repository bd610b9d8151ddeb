//! Chirp 的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::chirp::{CreateChirpRequest, ListChirpsQuery},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 发布 chirp
pub async fn create_chirp(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    payload: Result<Json<CreateChirpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let chirp = state.chirp_service.create(auth_context.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(chirp)))
}

/// 列出 chirp
pub async fn list_chirps(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListChirpsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!(error = %e.body_text(), "Rejected query string");
        AppError::malformed("Invalid query parameters")
    })?;

    let chirps = state.chirp_service.list(query).await?;

    Ok(Json(chirps))
}

/// 获取单个 chirp
pub async fn get_chirp(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let chirp_id = parse_chirp_id(id)?;

    let chirp = state.chirp_service.get(chirp_id).await?;

    Ok(Json(chirp))
}

/// 删除 chirp
pub async fn delete_chirp(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let chirp_id = parse_chirp_id(id)?;

    state
        .chirp_service
        .delete(auth_context.user_id, chirp_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_chirp_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    id.map(|Path(id)| id)
        .map_err(|_| AppError::malformed("Invalid chirp ID"))
}
