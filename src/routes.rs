//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{auth::session_auth_middleware, handlers, middleware::AppState};

/// 请求体上限（字节）
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点
    let public_routes = Router::new()
        .route("/api/users", post(handlers::user::create_user))
        .route("/api/login", post(handlers::auth::login))
        .route("/api/chirps", get(handlers::chirp::list_chirps))
        .route("/api/chirps/{id}", get(handlers::chirp::get_chirp));

    // 刷新令牌端点（凭据为 Bearer 刷新令牌，而非会话令牌）
    let refresh_routes = Router::new()
        .route("/api/refresh", post(handlers::auth::refresh))
        .route("/api/revoke", post(handlers::auth::revoke));

    // 需要会话令牌的路由
    let authenticated_routes = Router::new()
        .route("/api/users", put(handlers::user::update_user))
        .route("/api/chirps", post(handlers::chirp::create_chirp))
        .route("/api/chirps/{id}", delete(handlers::chirp::delete_chirp))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_middleware,
        ));

    // 支付回调（ApiKey）
    let webhook_routes =
        Router::new().route("/api/polka/webhooks", post(handlers::webhook::polka_webhook));

    // 管理端点
    let admin_routes = Router::new().route("/admin/reset", post(handlers::admin::reset));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(refresh_routes)
        .merge(authenticated_routes)
        .merge(webhook_routes)
        .merge(admin_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        // http_request span 需在最内层，user_id 才能记录到其上
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
