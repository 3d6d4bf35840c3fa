//! Test utilities for integration tests.
//!
//! Provides a sample survey document, router builders and small helpers for
//! sending requests and decoding JSON bodies.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use survey_front::{create_router, AppConfig, ProxyHeaderAuth, RouterConfig, SignedTokenAuth};

/// Secret shared by token-mode routers and tests.
pub const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";

/// Survey document used by most tests.
pub const SAMPLE_CONFIG: &str = r#"
title: Quarterly pulse
questions:
  - id: mood
    text: How are you feeling about the project?
    type: scale
    min: 1
    max: 5
  - id: comments
    text: Anything else?
    type: text
    optional: true
"#;

/// Minimal single-page app.
pub const INDEX_HTML: &str = "<!doctype html><title>Quarterly pulse</title><div id=app></div>";

pub fn sample_config() -> AppConfig {
    AppConfig::from_yaml(SAMPLE_CONFIG).unwrap()
}

/// Create a temporary static directory with `index.html` and one script.
pub fn static_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(dir.path().join("js")).unwrap();
    std::fs::write(dir.path().join("js").join("app.js"), "console.log('survey');").unwrap();
    dir
}

/// Router using reverse-proxy header authentication.
pub fn proxy_router(static_root: &Path) -> Router {
    let config = RouterConfig::new(Arc::new(ProxyHeaderAuth::new()))
        .with_static_dir(static_root)
        .with_tracing(false);
    create_router(sample_config(), config)
}

/// Router using signed token authentication with [`TEST_SECRET`].
pub fn token_router(static_root: &Path) -> Router {
    let config = RouterConfig::new(Arc::new(SignedTokenAuth::new(TEST_SECRET)))
        .with_static_dir(static_root)
        .with_tracing(false);
    create_router(sample_config(), config)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, user: &str, groups: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-user", user)
        .header("x-forwarded-groups", groups)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json_as(uri: &str, user: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-user", user)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Assert a structured error body and return it.
pub async fn assert_error(response: Response<Body>, status: StatusCode, error_type: &str) -> Value {
    assert_eq!(response.status(), status);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json")));

    let body = body_json(response).await;
    assert_eq!(body["error"], error_type);
    assert_eq!(body["status"], status.as_u16());
    assert!(body["message"].is_string());
    body
}
