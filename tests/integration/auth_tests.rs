//! Authentication integration tests.
//!
//! Tests verify:
//! - Valid signed tokens reach the handler with their identity
//! - Expired, forged and malformed tokens are rejected
//! - Proxy headers are ignored in token mode
//! - Public routes stay public in both modes

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode};

use survey_front::SignedTokenAuth;

use super::test_utils::{assert_error, body_json, get, send, static_dir, token_router, TEST_SECRET};

fn bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

// =============================================================================
// Valid Tokens
// =============================================================================

#[tokio::test]
async fn test_valid_token_succeeds() {
    let dir = static_dir();
    let auth = SignedTokenAuth::new(TEST_SECRET);
    let token = auth.issue(
        "alice",
        &["reviewers".to_string(), "staff".to_string()],
        Duration::from_secs(3600),
    );

    let response = send(token_router(dir.path()), bearer("/api", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["groups"][0], "reviewers");
    assert_eq!(body["data"]["groups"][1], "staff");
}

#[tokio::test]
async fn test_valid_token_can_submit_response() {
    let dir = static_dir();
    let token = SignedTokenAuth::new(TEST_SECRET).issue("alice", &[], Duration::from_secs(60));

    let request = Request::builder()
        .method("POST")
        .uri("/api/response")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"mood": 5}"#))
        .unwrap();
    let response = send(token_router(dir.path()), request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// =============================================================================
// Rejected Tokens
// =============================================================================

#[tokio::test]
async fn test_missing_token_rejected() {
    let dir = static_dir();
    let response = send(token_router(dir.path()), get("/api")).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "missing_credentials").await;
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let dir = static_dir();
    let token = SignedTokenAuth::new(TEST_SECRET).issue_with_expiry("alice", &[], now() - 100);

    let response = send(token_router(dir.path()), bearer("/api", &token)).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "token_expired").await;
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let dir = static_dir();
    let token = SignedTokenAuth::new("some-other-secret").issue("alice", &[], Duration::from_secs(60));

    let response = send(token_router(dir.path()), bearer("/api", &token)).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "invalid_signature").await;
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let dir = static_dir();
    let token = SignedTokenAuth::new(TEST_SECRET).issue(
        "alice",
        &["staff".to_string()],
        Duration::from_secs(60),
    );
    let tampered = token.replace("groups=staff", "groups=admins");

    let response = send(token_router(dir.path()), bearer("/api", &tampered)).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "invalid_signature").await;
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let dir = static_dir();
    let response = send(token_router(dir.path()), bearer("/api", "garbage")).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "invalid_token").await;
}

#[tokio::test]
async fn test_rejected_request_never_reaches_body_parsing() {
    let dir = static_dir();
    let request = Request::builder()
        .method("POST")
        .uri("/api/response")
        .header("authorization", "Bearer garbage")
        .header("content-type", "application/json")
        .body(Body::from("{broken"))
        .unwrap();
    let response = send(token_router(dir.path()), request).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "invalid_token").await;
}

#[tokio::test]
async fn test_proxy_headers_ignored_in_token_mode() {
    let dir = static_dir();
    let request = Request::builder()
        .uri("/api")
        .header("x-forwarded-user", "mallory")
        .header("x-forwarded-groups", "admins")
        .body(Body::empty())
        .unwrap();
    let response = send(token_router(dir.path()), request).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "missing_credentials").await;
}

// =============================================================================
// Public Routes
// =============================================================================

#[tokio::test]
async fn test_public_routes_in_token_mode() {
    let dir = static_dir();
    for uri in ["/api/questions", "/api/config", "/health", "/index.html"] {
        let response = send(token_router(dir.path()), get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let response = send(token_router(dir.path()), get("/")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}
