//! Router tests for the auth endpoints, backed by the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use upwatch_api::{AppState, create_router};
use upwatch_core::auth::{
    AuthService, InMemoryStore, PasswordHashing, SessionManager, UserDirectory,
};
use upwatch_shared::config::PasswordConfig;
use upwatch_shared::{TokenConfig, TokenIssuer};

fn app() -> Router {
    let store = Arc::new(InMemoryStore::new());
    let hashing = PasswordHashing::new(&PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let tokens = TokenIssuer::new(TokenConfig {
        access_secret: "access-secret-for-tests".into(),
        refresh_secret: "refresh-secret-for-tests".into(),
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(7),
    })
    .unwrap();

    let auth = AuthService::new(
        UserDirectory::new(store.clone(), hashing),
        SessionManager::new(store),
        Arc::new(tokens),
    );

    create_router(
        AppState {
            auth: Arc::new(auth),
        },
        Duration::from_secs(10),
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str, fingerprint: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "username": username,
            "password": "secret1",
            "email": "alice@example.com",
            "fingerprint": fingerprint,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn token<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_returns_token_pair() {
    let app = app();

    let body = register(&app, "alice", "device-A").await;

    assert!(!token(&body, "access_token").is_empty());
    assert!(!token(&body, "refresh_token").is_empty());
    assert_eq!(body["expires_in"], 900);
}

#[tokio::test]
async fn test_register_validation_and_conflict() {
    let app = app();
    register(&app, "alice", "device-A").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"username": "al", "password": "secret1", "fingerprint": "fp"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"username": "alice", "password": "secret1", "fingerprint": "fp"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_oversized_fingerprint_is_a_validation_error() {
    let app = app();
    let fingerprint = "f".repeat(256);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "secret1",
            "fingerprint": fingerprint,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // nothing was registered, so the name is still free
    register(&app, "alice", "device-A").await;
}

#[tokio::test]
async fn test_login_failures_share_one_response() {
    let app = app();
    register(&app, "alice", "device-A").await;

    let unknown = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "bob", "password": "secret1", "fingerprint": "fp"})),
    )
    .await;
    let wrong = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "nope", "fingerprint": "fp"})),
    )
    .await;

    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.1["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let app = app();
    let first = register(&app, "alice", "device-A").await;
    let refresh_body = json!({
        "refresh_token": token(&first, "refresh_token"),
        "fingerprint": "device-A",
    });

    let (status, second) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(refresh_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(token(&second, "refresh_token"), token(&first, "refresh_token"));

    let (status, body) = send(&app, "POST", "/api/v1/auth/refresh", None, Some(refresh_body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/v1/auth/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, body) = send(&app, "GET", "/api/v1/auth/sessions", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_WRONG_FORMAT");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = app();
    let pair = register(&app, "alice", "device-A").await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/auth/sessions",
        Some(token(&pair, "refresh_token")),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_session_listing_logout_and_logout_all() {
    let app = app();
    let a = register(&app, "alice", "device-A").await;
    let (_, b) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "secret1", "fingerprint": "device-B"})),
    )
    .await;
    let access = token(&b, "access_token");

    let (status, sessions) = send(&app, "GET", "/api/v1/auth/sessions", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 2);

    let logout_body = json!({
        "refresh_token": token(&a, "refresh_token"),
        "fingerprint": "device-A",
    });
    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/auth/logout",
            Some(access),
            Some(logout_body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, sessions) = send(&app, "GET", "/api/v1/auth/sessions", Some(access), None).await;
    assert_eq!(sessions[0]["fingerprint"], "device-B");

    let (status, body) = send(&app, "POST", "/api/v1/auth/logout-all", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], 1);
}

#[tokio::test]
async fn test_delete_account() {
    let app = app();
    let pair = register(&app, "alice", "device-A").await;
    let access = token(&pair, "access_token");

    let (status, _) = send(&app, "DELETE", "/api/v1/auth/account", Some(access), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({
            "refresh_token": token(&pair, "refresh_token"),
            "fingerprint": "device-A",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "SESSION_NOT_FOUND");
}
