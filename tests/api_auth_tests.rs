//! 认证 API 集成测试

use axum::http::StatusCode;
use chirpy::auth::jwt::Claims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;

mod common;
use common::{bearer, TestApp, JWT_SECRET, PASSWORD};

fn claims(token: &serde_json::Value) -> Claims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    decode::<Claims>(
        token.as_str().unwrap(),
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &validation,
    )
    .unwrap()
    .claims
}

#[tokio::test]
async fn test_create_user() {
    let app = TestApp::new();

    let user = app.create_user("walt@breakingbad.com").await;

    assert_eq!(user["email"], "walt@breakingbad.com");
    assert_eq!(user["is_chirpy_red"], false);
    assert!(user["id"].is_string());
    assert!(user.get("hashed_password").is_none());
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let app = TestApp::new();
    app.create_user("walt@breakingbad.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/users",
            None,
            Some(json!({ "email": "walt@breakingbad.com", "password": "x" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.user_count().await, 1);
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new();
    let user = app.create_user("walt@breakingbad.com").await;

    let login = app.login("walt@breakingbad.com").await;

    assert_eq!(login["id"], user["id"]);
    assert_eq!(login["email"], "walt@breakingbad.com");
    assert!(login["token"].is_string());
    assert_eq!(login["refresh_token"].as_str().unwrap().len(), 64);

    let claims = claims(&login["token"]);
    assert_eq!(claims.iss, "chirpy");
    assert_eq!(claims.sub, user["id"].as_str().unwrap());
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[tokio::test]
async fn test_login_lifetime_is_capped() {
    let app = TestApp::new();
    app.create_user("walt@breakingbad.com").await;

    for (requested, expected) in [(999_999, 3600), (0, 3600), (-1, 3600), (120, 120)] {
        let (status, login) = app
            .send(
                "POST",
                "/api/login",
                None,
                Some(json!({
                    "email": "walt@breakingbad.com",
                    "password": PASSWORD,
                    "expires_in_seconds": requested,
                })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let claims = claims(&login["token"]);
        assert_eq!(claims.exp - claims.iat, expected, "requested {}", requested);
    }
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    app.create_user("walt@breakingbad.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "walt@breakingbad.com", "password": "WrongPassword" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 401);
    assert_eq!(body["error"]["message"], "Incorrect email or password");
    assert!(body["error"]["request_id"].is_string());
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let app = TestApp::new();
    app.create_user("walt@breakingbad.com").await;

    let (wrong_status, wrong_body) = app
        .send(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "walt@breakingbad.com", "password": "nope" })),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .send(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "jesse@breakingbad.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body["error"]["message"], unknown_body["error"]["message"]);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app.send_raw("POST", "/api/login", "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
}

#[tokio::test]
async fn test_refresh_issues_session_token() {
    let app = TestApp::new();
    let login = app.signup_and_login("walt@breakingbad.com").await;

    let (status, body) = app
        .send("POST", "/api/refresh", Some(&bearer(&login["refresh_token"])), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(claims(&body["token"]).sub, login["id"].as_str().unwrap());
    assert_eq!(body.as_object().unwrap().len(), 1);

    // 刷新令牌不轮换，可以重复使用
    let (status, _) = app
        .send("POST", "/api/refresh", Some(&bearer(&login["refresh_token"])), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_session_token_and_garbage() {
    let app = TestApp::new();
    let login = app.signup_and_login("walt@breakingbad.com").await;

    let (status, _) = app
        .send("POST", "/api/refresh", Some(&bearer(&login["token"])), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("POST", "/api/refresh", Some("Bearer abc"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("POST", "/api/refresh", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoke_flow() {
    let app = TestApp::new();
    let login = app.signup_and_login("walt@breakingbad.com").await;
    let refresh = bearer(&login["refresh_token"]);

    let (status, body) = app.send("POST", "/api/revoke", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let stored = app
        .store
        .refresh_token(login["refresh_token"].as_str().unwrap())
        .await
        .unwrap();
    assert!(stored.revoked_at.is_some());

    let (status, _) = app.send("POST", "/api/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 重复撤销同样被拒绝
    let (status, _) = app.send("POST", "/api/revoke", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 会话令牌不受影响
    let (status, _) = app
        .send(
            "POST",
            "/api/chirps",
            Some(&bearer(&login["token"])),
            Some(json!({ "body": "still here" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_update_user() {
    let app = TestApp::new();
    let login = app.signup_and_login("walt@breakingbad.com").await;

    let (status, body) = app
        .send(
            "PUT",
            "/api/users",
            Some(&bearer(&login["token"])),
            Some(json!({ "email": "heisenberg@breakingbad.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], login["id"]);
    assert_eq!(body["email"], "heisenberg@breakingbad.com");

    app.login("heisenberg@breakingbad.com").await;
}

#[tokio::test]
async fn test_update_user_requires_session() {
    let app = TestApp::new();
    let login = app.signup_and_login("walt@breakingbad.com").await;
    let update = json!({ "email": "x@y.com", "password": "pw" });

    let (status, _) = app.send("PUT", "/api/users", None, Some(update.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send("PUT", "/api/users", Some("Bearer invalid"), Some(update.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 刷新令牌不能当作会话令牌使用
    let (status, _) = app
        .send("PUT", "/api/users", Some(&bearer(&login["refresh_token"])), Some(update))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthorized_responses_share_one_message() {
    let app = TestApp::new();
    let login = app.signup_and_login("walt@breakingbad.com").await;
    let body = json!({ "body": "hi" });

    let (_, missing) = app.send("POST", "/api/chirps", None, Some(body.clone())).await;
    let (_, garbage) = app
        .send("POST", "/api/chirps", Some("Bearer garbage"), Some(body.clone()))
        .await;
    let (_, wrong_kind) = app
        .send("POST", "/api/chirps", Some(&bearer(&login["refresh_token"])), Some(body))
        .await;

    assert_eq!(missing["error"]["message"], "Unauthorized");
    assert_eq!(garbage["error"]["message"], "Unauthorized");
    assert_eq!(wrong_kind["error"]["message"], "Unauthorized");
}

#[tokio::test]
async fn test_response_carries_tracking_headers() {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/chirps")
                .header("x-trace-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-trace-id"], "trace-abc");
    assert!(response.headers().contains_key("x-request-id"));
}
