//! HTTP server layer for the survey front end.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                           HTTP Layer                              │
//! │   GET /   GET /api/*   POST /api/response   GET /<static asset>   │
//! │                                                                   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────────┐  │
//! │  │  redirect  │ │  handlers  │ │    auth    │ │     routes     │  │
//! │  │ (fwd host) │ │ (API, err) │ │ (identity) │ │ (router config)│  │
//! │  └────────────┘ └────────────┘ └────────────┘ └────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod redirect;
pub mod routes;

pub use auth::{
    auth_middleware, AuthError, Authenticator, Identity, ProxyHeaderAuth, SharedAuthenticator,
    SignedTokenAuth,
};
pub use handlers::{
    config_handler, health_handler, ping_handler, questions_handler, response_handler,
    success_json_response, AppState, ConfigResponse, ErrorResponse, HealthResponse, JsonBody,
    PingResponse, SuccessResponse,
};
pub use redirect::{index_redirect_handler, resolve_redirect};
pub use routes::{create_router, create_router_with_state, RouterConfig};
