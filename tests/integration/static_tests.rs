//! Static asset serving tests.

use axum::http::StatusCode;

use super::test_utils::{body_bytes, get, proxy_router, send, static_dir, INDEX_HTML};

#[tokio::test]
async fn test_index_served() {
    let dir = static_dir();
    let response = send(proxy_router(dir.path()), get("/index.html")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    assert_eq!(body_bytes(response).await, INDEX_HTML.as_bytes());
}

#[tokio::test]
async fn test_nested_asset_served() {
    let dir = static_dir();
    let response = send(proxy_router(dir.path()), get("/js/app.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"console.log('survey');");
}

#[tokio::test]
async fn test_directory_serves_its_index() {
    let dir = static_dir();
    std::fs::write(dir.path().join("js").join("index.html"), "nested").unwrap();

    let response = send(proxy_router(dir.path()), get("/js/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"nested");
}

#[tokio::test]
async fn test_missing_asset_is_404() {
    let dir = static_dir();
    let response = send(proxy_router(dir.path()), get("/missing.css")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_path_traversal_blocked() {
    let root = tempfile::tempdir().unwrap();
    let public = root.path().join("public");
    std::fs::create_dir(&public).unwrap();
    std::fs::write(public.join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(root.path().join("secret.txt"), "secret").unwrap();

    let response = send(proxy_router(&public), get("/../secret.txt")).await;
    assert_ne!(response.status(), StatusCode::OK);

    let response = send(proxy_router(&public), get("/%2e%2e/secret.txt")).await;
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_routes_take_precedence() {
    let dir = static_dir();
    std::fs::create_dir(dir.path().join("api")).unwrap();
    std::fs::write(dir.path().join("api").join("config"), "shadowed").unwrap();

    let response = send(proxy_router(dir.path()), get("/api/config")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(body_bytes(response).await, b"shadowed");
}
