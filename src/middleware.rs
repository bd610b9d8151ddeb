//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{
    auth::{AuthGuard, PasswordHasher, RefreshTokenManager, SessionTokenCodec},
    config::AppConfig,
    error::AppError,
    repository::Store,
    services::{AuthService, ChirpService},
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 所有组件在启动时构建一次，之后只读共享
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<AuthGuard>,
    pub auth_service: Arc<AuthService>,
    pub chirp_service: Arc<ChirpService>,
}

impl AppState {
    /// 基于配置和存储实现组装全部服务
    pub fn new(config: &AppConfig, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let store_timeout = config.database.store_timeout();

        let sessions = Arc::new(SessionTokenCodec::from_config(config)?);
        let refresh_tokens = Arc::new(RefreshTokenManager::new(store.clone(), store_timeout));
        let guard = Arc::new(AuthGuard::new(config, sessions, refresh_tokens));

        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            PasswordHasher::new(),
            guard.clone(),
            store_timeout,
            config.security.is_dev(),
        ));
        let chirp_service = Arc::new(ChirpService::new(store, store_timeout));

        Ok(Self {
            guard,
            auth_service,
            chirp_service,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    // user_id 由会话认证中间件填充
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
        user_id = tracing::field::Empty,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            _ => "OTHER",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        if status == 401 {
            metrics::counter!("auth_rejections_total").increment(1);
        }

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中添加 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
