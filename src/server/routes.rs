//! Router configuration for the survey front end.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, panic recovery, CORS and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /                   - Redirect to /index.html (public)
//! /health             - Health check (public)
//! /api                - Identity echo (protected)
//! /api/questions      - Configured questions (public)
//! /api/config         - Survey title (public)
//! /api/response       - Submit a response (protected)
//! /*                  - Static assets from the static directory (public)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use survey_front::{create_router, AppConfig, ProxyHeaderAuth, RouterConfig};
//!
//! let app_config = AppConfig::from_env()?;
//! let config = RouterConfig::new(Arc::new(ProxyHeaderAuth::new()))
//!     .with_static_dir("dist");
//!
//! let router = create_router(app_config, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, ProxyHeaderAuth, SharedAuthenticator};
use super::handlers::{
    config_handler, health_handler, panic_response, ping_handler, questions_handler,
    response_handler, AppState,
};
use super::redirect::index_redirect_handler;
use crate::app_config::AppConfig;

/// Default directory holding the single-page app.
pub const DEFAULT_STATIC_DIR: &str = "static";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Authenticator guarding the protected routes
    pub authenticator: SharedAuthenticator,

    /// Directory served for every path without an explicit route
    pub static_dir: PathBuf,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration using the given authenticator.
    ///
    /// By default:
    /// - Static assets come from `./static`
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(authenticator: SharedAuthenticator) -> Self {
        Self {
            authenticator,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set the static asset directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    /// Reverse-proxy header authentication with default settings.
    fn default() -> Self {
        Self::new(Arc::new(ProxyHeaderAuth::new()))
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The configuration is moved into shared state; handlers only ever read it.
pub fn create_router(app_config: AppConfig, config: RouterConfig) -> Router {
    create_router_with_state(AppState::new(app_config), config)
}

/// Create the router from an existing [`AppState`].
pub fn create_router_with_state(app_state: AppState, config: RouterConfig) -> Router {
    // Auth applies only to the routes registered before `route_layer`
    let protected_routes: Router<AppState> = Router::new()
        .route("/api", get(ping_handler))
        .route("/api/response", post(response_handler))
        .route_layer(middleware::from_fn_with_state(
            config.authenticator.clone(),
            auth_middleware,
        ));

    let public_routes: Router<AppState> = Router::new()
        .route("/", get(index_redirect_handler))
        .route("/health", get(health_handler))
        .route("/api/questions", get(questions_handler))
        .route("/api/config", get(config_handler));

    let router = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(app_state)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
