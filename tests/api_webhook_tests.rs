//! 支付回调与管理端点集成测试

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_config, TestApp, POLKA_KEY};

fn api_key() -> String {
    format!("ApiKey {}", POLKA_KEY)
}

#[tokio::test]
async fn test_webhook_upgrades_user() {
    let app = TestApp::new();
    let user = app.create_user("walt@breakingbad.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/polka/webhooks",
            Some(&api_key()),
            Some(json!({ "event": "user.upgraded", "data": { "user_id": user["id"] } })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let login = app.login("walt@breakingbad.com").await;
    assert_eq!(login["is_chirpy_red"], true);
}

#[tokio::test]
async fn test_webhook_ignores_other_events() {
    let app = TestApp::new();
    let user = app.create_user("walt@breakingbad.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/polka/webhooks",
            Some(&api_key()),
            Some(json!({ "event": "user.payment_failed", "data": { "user_id": user["id"] } })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let login = app.login("walt@breakingbad.com").await;
    assert_eq!(login["is_chirpy_red"], false);
}

#[tokio::test]
async fn test_webhook_unknown_user() {
    let app = TestApp::new();

    let (status, _) = app
        .send(
            "POST",
            "/api/polka/webhooks",
            Some(&api_key()),
            Some(json!({ "event": "user.upgraded", "data": { "user_id": uuid::Uuid::new_v4() } })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_requires_api_key() {
    let app = TestApp::new();
    let user = app.create_user("walt@breakingbad.com").await;
    let payload = json!({ "event": "user.upgraded", "data": { "user_id": user["id"] } });

    for auth in [None, Some("ApiKey wrong"), Some("Bearer f271c81ff7084ee5b99a5091b42d486e")] {
        let (status, _) = app
            .send("POST", "/api/polka/webhooks", auth, Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "auth {:?}", auth);
    }

    let login = app.login("walt@breakingbad.com").await;
    assert_eq!(login["is_chirpy_red"], false);
}

#[tokio::test]
async fn test_reset_on_dev() {
    let app = TestApp::new();
    app.create_user("walt@breakingbad.com").await;
    app.create_user("saul@bettercall.com").await;

    let (status, body) = app.send("POST", "/admin/reset", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_users"], 2);
    assert_eq!(app.store.user_count().await, 0);
}

#[tokio::test]
async fn test_reset_forbidden_outside_dev() {
    let mut config = create_test_config();
    config.security.platform = "prod".to_string();
    let app = TestApp::with_config(config);
    app.create_user("walt@breakingbad.com").await;

    let (status, _) = app.send("POST", "/admin/reset", None, None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.user_count().await, 1);
}
