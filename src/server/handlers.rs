//! HTTP request handlers for the survey API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /api` - Identity echo (protected)
//! - `GET /api/questions` - Configured questions
//! - `GET /api/config` - Public configuration (title)
//! - `POST /api/response` - Submit a response (protected, JSON body required)
//!
//! Successful API responses are wrapped in a [`SuccessResponse`] envelope.
//! Failures are returned as an [`ErrorResponse`].

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::app_config::AppConfig;
use crate::error::ApiError;

use super::auth::Identity;

/// Message returned when `POST /api/response` does not carry JSON.
pub const NOT_JSON_MESSAGE: &str = "Request should be JSON";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// The configuration is loaded once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_shared(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Uniform wrapper for successful API responses.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    /// Always `true`
    pub success: bool,

    /// Response payload
    pub data: T,
}

/// Wrap any serializable payload in the success envelope.
pub fn success_json_response<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "bad_request", "missing_credentials")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Payload of `GET /api`.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ping: &'static str,
    pub username: String,
    pub groups: Vec<String>,
}

/// Payload of `GET /api/config`.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub title: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// Bad requests are logged at WARN and echoed to the client. Internal errors
/// are logged at ERROR and answered with an opaque message.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "bad_request", message.clone())
            }
            ApiError::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                message.clone(),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Request failed: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Request rejected: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Response for a handler that panicked.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::internal(format!("handler panicked: {}", detail)).into_response()
}

// =============================================================================
// JSON Body Extractor
// =============================================================================

/// A request body that must be present and valid JSON.
///
/// Unlike `axum::Json`, failures are reported as an [`ApiError`] so clients
/// always receive the structured error body. A body over the request limit
/// is a [`ApiError::PayloadTooLarge`]; everything else, including a JSON
/// `null` body, is a [`ApiError::BadRequest`].
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Err(ApiError::bad_request(NOT_JSON_MESSAGE));
        }

        // Over-limit bodies keep their 413; other read failures are 400
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(rejection.body_text())
            } else {
                ApiError::bad_request(rejection.body_text())
            }
        })?;

        if body.is_empty() {
            return Err(ApiError::bad_request(NOT_JSON_MESSAGE));
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Null) | Err(_) => Err(ApiError::bad_request(NOT_JSON_MESSAGE)),
            Ok(value) => Ok(JsonBody(value)),
        }
    }
}

/// Whether the request declares a JSON content type.
///
/// Accepts `application/json` and any `application/*+json` type, with or
/// without parameters.
pub fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Echo the authenticated identity.
///
/// # Endpoint
///
/// `GET /api`
pub async fn ping_handler(identity: Identity) -> Json<SuccessResponse<PingResponse>> {
    success_json_response(PingResponse {
        ping: "pong",
        username: identity.username,
        groups: identity.groups,
    })
}

/// Return the configured questions untouched.
///
/// # Endpoint
///
/// `GET /api/questions`
pub async fn questions_handler(State(state): State<AppState>) -> Json<SuccessResponse<Value>> {
    success_json_response(state.config.questions().clone())
}

/// Return the public part of the configuration.
///
/// # Endpoint
///
/// `GET /api/config`
pub async fn config_handler(State(state): State<AppState>) -> Json<SuccessResponse<ConfigResponse>> {
    success_json_response(ConfigResponse {
        title: state.config.title().to_string(),
    })
}

/// Accept a survey response.
///
/// The body is only checked for being JSON; nothing is stored.
///
/// # Endpoint
///
/// `POST /api/response`
///
/// # Response
///
/// - `204 No Content` on success
/// - `400 Bad Request` when the body is missing or not JSON
/// - `401 Unauthorized` when the caller is not authenticated
pub async fn response_handler(identity: Identity, JsonBody(body): JsonBody) -> StatusCode {
    debug!(
        username = %identity.username,
        kind = json_kind(&body),
        "Survey response received"
    );
    StatusCode::NO_CONTENT
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Tests
// =============================================================================
