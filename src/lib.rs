//! # Survey Front
//!
//! A small HTTP front end for a survey single-page application.
//!
//! It serves the app's static assets, exposes JSON endpoints backed by a
//! YAML configuration document, and guards the endpoints that need a caller
//! identity behind a pluggable authentication layer.
//!
//! ## Features
//!
//! - **Proxy-aware root redirect**: `GET /` is redirected to `index.html` on
//!   the host and scheme the client used, rebuilt from `X-Forwarded-*`
//! - **Immutable configuration**: the `CONFIG` document is parsed once at
//!   startup and shared read-only
//! - **Pluggable authentication**: trusted proxy headers or HMAC-signed
//!   bearer tokens
//! - **Structured errors**: every failure is answered with a JSON error body
//!
//! ## Modules
//!
//! - [`app_config`]: The YAML configuration document
//! - [`config`]: Command-line and environment settings
//! - [`error`]: Error types
//! - [`server`]: HTTP routes, handlers and middleware

pub mod app_config;
pub mod config;
pub mod error;
pub mod server;

pub use app_config::{AppConfig, CONFIG_ENV_VAR};
pub use config::{AuthMode, CheckConfig, Cli, Command, ServeConfig, SignConfig};
pub use error::{ApiError, AppConfigError};
pub use server::{
    create_router, AppState, Authenticator, Identity, ProxyHeaderAuth, RouterConfig,
    SignedTokenAuth,
};
