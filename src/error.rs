use thiserror::Error;

/// Errors raised while loading the application configuration at startup
#[derive(Debug, Error)]
pub enum AppConfigError {
    /// The `CONFIG` environment variable is not set
    #[error("Missing CONFIG environment variable")]
    Missing,

    /// The document is not valid YAML
    #[error("Invalid YAML in CONFIG: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document parsed but does not have the expected shape
    #[error("Invalid CONFIG document: {0}")]
    Invalid(String),

    /// A required top-level key is absent
    #[error("CONFIG is missing required key '{0}'")]
    MissingKey(&'static str),
}

/// Errors returned by API handlers.
///
/// Bad requests carry a message that is returned to the client verbatim.
/// Internal errors are logged and answered with an opaque 500.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The client sent a request the handler cannot process (HTTP 400)
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit (HTTP 413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Something the client cannot fix went wrong (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON serialization failed: {}", err))
    }
}
