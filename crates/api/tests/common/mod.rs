//! Shared helpers for API integration tests.
//!
//! The app runs on the in-memory store, so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use skillswap_api::auth::jwt::{generate_access_token, JwtConfig};
use skillswap_api::config::ServerConfig;
use skillswap_api::router::build_app_router;
use skillswap_api::state::AppState;
use skillswap_core::events::NotificationSink;
use skillswap_core::memory::InMemoryStore;
use skillswap_core::roles::{ROLE_ADMIN, ROLE_USER};
use skillswap_core::services::Services;
use skillswap_core::types::UserId;
use skillswap_events::EventBus;

pub const ALICE: UserId = 1;
pub const BOB: UserId = 2;
pub const CAROL: UserId = 3;
pub const ADMIN: UserId = 99;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".parse().unwrap()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router over a fresh in-memory store.
pub fn build_test_app() -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let sink: Arc<dyn NotificationSink> = event_bus.clone();

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        services: Services::new(InMemoryStore::new().repositories(), sink),
        event_bus,
    };
    build_app_router(state, &config)
}

pub fn user_token(user_id: UserId) -> String {
    generate_access_token(user_id, ROLE_USER, &test_config().jwt).unwrap()
}

pub fn admin_token() -> String {
    generate_access_token(ADMIN, ROLE_ADMIN, &test_config().jwt).unwrap()
}

/// Send a request without a body.
pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token).await
}

/// Send a request with a JSON body.
pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send_json(app, Method::POST, uri, token, body).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn session_body(user2_id: UserId) -> serde_json::Value {
    let start = chrono::Utc::now() + chrono::Duration::days(1);
    serde_json::json!({
        "skill1_id": 10,
        "description_of_service1": "Guitar lessons, one hour weekly",
        "user2_id": user2_id,
        "skill2_id": 20,
        "description_of_service2": "Conversational Spanish practice",
        "start_date": start.to_rfc3339(),
    })
}

/// Propose a session from `user1` to `user2` and return its id.
pub async fn propose(app: &Router, user1_id: UserId, user2_id: UserId) -> i64 {
    let response = post_json(
        app,
        "/api/v1/sessions",
        &user_token(user1_id),
        session_body(user2_id),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Propose and accept a session, returning its id.
pub async fn active_session(app: &Router, user1_id: UserId, user2_id: UserId) -> i64 {
    let id = propose(app, user1_id, user2_id).await;
    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/accept"),
        Some(&user_token(user2_id)),
    )
    .await;
    assert_eq!(response.status(), 200);
    id
}
