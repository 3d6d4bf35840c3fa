//! Request authentication for protected API routes.
//!
//! Protected routes sit behind [`auth_middleware`], which asks an
//! [`Authenticator`] for the caller's [`Identity`] and stores it in the
//! request extensions. Handlers take `Identity` as an argument; a request
//! that fails authentication never reaches them.
//!
//! Two authenticators are provided:
//!
//! - [`ProxyHeaderAuth`] trusts identity headers injected by an
//!   authenticating reverse proxy (`X-Forwarded-User`, `X-Forwarded-Groups`).
//! - [`SignedTokenAuth`] verifies HMAC-SHA256 signed bearer tokens.
//!
//! # Token Format
//!
//! A token is a form-urlencoded string carrying the identity, an expiry and
//! a signature:
//!
//! ```text
//! user=alice&groups=admins%2Cteam-a&exp=1735689600&sig=3f9a...
//! ```
//!
//! The signature is computed over the canonical query (pairs sorted by key,
//! `sig` excluded):
//!
//! ```text
//! signature = HMAC-SHA256(secret_key, "exp=...&groups=...&user=...")
//! ```
//!
//! Tokens are sent as `Authorization: Bearer <token>`.
//!
//! # Example
//!
//! ```rust
//! use survey_front::server::auth::SignedTokenAuth;
//! use std::time::Duration;
//!
//! let auth = SignedTokenAuth::new("my-secret-key");
//! let token = auth.issue("alice", &["admins".to_string()], Duration::from_secs(3600));
//!
//! let identity = auth.verify(&token).unwrap();
//! assert_eq!(identity.username, "alice");
//! assert_eq!(identity.groups, vec!["admins".to_string()]);
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Default header carrying the authenticated user name.
pub const DEFAULT_USER_HEADER: &str = "x-forwarded-user";

/// Default header carrying the user's comma-separated groups.
pub const DEFAULT_GROUPS_HEADER: &str = "x-forwarded-groups";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// User name
    pub username: String,

    /// Group memberships, in the order the credential listed them
    pub groups: Vec<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            username: username.into(),
            groups,
        }
    }
}

/// Authentication error types.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No credentials were supplied
    MissingCredentials,

    /// Token is present but cannot be parsed
    InvalidToken(String),

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Token signature does not match
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Authentication required"),
            AuthError::InvalidToken(reason) => write!(f, "Invalid token: {}", reason),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Token expired at {} (current time: {})",
                expired_at, current_time
            ),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Expired { .. } => "token_expired",
            AuthError::InvalidSignature => "invalid_signature",
        };
        let status = StatusCode::UNAUTHORIZED;
        let message = self.to_string();

        // A bad signature may be a forgery attempt; everything else is routine
        match &self {
            AuthError::InvalidSignature => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Authenticator Trait
// =============================================================================

/// Resolves the identity behind a request.
///
/// Implementations may consult external services, hence the async signature.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request from its headers.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError>;
}

/// Authenticator shared between the router and the middleware.
pub type SharedAuthenticator = Arc<dyn Authenticator>;

// =============================================================================
// Reverse Proxy Headers
// =============================================================================

/// Authenticator that trusts identity headers set by a reverse proxy.
///
/// Only safe when the proxy strips these headers from client requests.
#[derive(Debug, Clone)]
pub struct ProxyHeaderAuth {
    user_header: HeaderName,
    groups_header: HeaderName,
}

impl ProxyHeaderAuth {
    /// Use the default `x-forwarded-user` / `x-forwarded-groups` headers.
    pub fn new() -> Self {
        Self {
            user_header: HeaderName::from_static(DEFAULT_USER_HEADER),
            groups_header: HeaderName::from_static(DEFAULT_GROUPS_HEADER),
        }
    }

    /// Use custom header names.
    pub fn with_header_names(
        user_header: &str,
        groups_header: &str,
    ) -> Result<Self, http::header::InvalidHeaderName> {
        Ok(Self {
            user_header: HeaderName::from_bytes(user_header.as_bytes())?,
            groups_header: HeaderName::from_bytes(groups_header.as_bytes())?,
        })
    }

    pub fn user_header(&self) -> &HeaderName {
        &self.user_header
    }

    pub fn groups_header(&self) -> &HeaderName {
        &self.groups_header
    }
}

impl Default for ProxyHeaderAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for ProxyHeaderAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let username = headers
            .get(&self.user_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        let groups = headers
            .get(&self.groups_header)
            .and_then(|v| v.to_str().ok())
            .map(parse_groups)
            .unwrap_or_default();

        Ok(Identity::new(username, groups))
    }
}

/// Split a comma-separated group list, dropping empty entries.
pub fn parse_groups(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Signed Tokens
// =============================================================================

/// Signed bearer token authenticator using HMAC-SHA256.
#[derive(Clone)]
pub struct SignedTokenAuth {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl SignedTokenAuth {
    /// Create a new authenticator with the given secret key.
    ///
    /// The key should be at least 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Issue a token valid for `ttl`.
    ///
    /// Group names must not contain commas. The expiry saturates at
    /// `u64::MAX` for very long TTLs.
    pub fn issue(&self, username: &str, groups: &[String], ttl: Duration) -> String {
        let expiry = unix_now().saturating_add(ttl.as_secs());
        self.issue_with_expiry(username, groups, expiry)
    }

    /// Issue a token with a specific expiry timestamp (Unix epoch seconds).
    pub fn issue_with_expiry(&self, username: &str, groups: &[String], expiry: u64) -> String {
        let groups = groups.join(",");
        let expiry = expiry.to_string();
        let claims = [
            ("user", username),
            ("groups", groups.as_str()),
            ("exp", expiry.as_str()),
        ];
        let signature = self.compute_signature(&claims);

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in claims {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("sig", &signature);
        serializer.finish()
    }

    /// Verify a token and return the identity it carries.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = TokenClaims::parse(token)?;

        // Check expiry first
        let current_time = unix_now();
        if current_time > claims.expiry {
            return Err(AuthError::Expired {
                expired_at: claims.expiry,
                current_time,
            });
        }

        let provided_sig =
            hex::decode(&claims.signature).map_err(|_| AuthError::InvalidSignature)?;

        let expiry = claims.expiry.to_string();
        let expected_sig_hex = self.compute_signature(&[
            ("user", claims.username.as_str()),
            ("groups", claims.groups.as_str()),
            ("exp", expiry.as_str()),
        ]);
        let expected_sig =
            hex::decode(&expected_sig_hex).map_err(|_| AuthError::InvalidSignature)?;

        // Constant-time comparison
        if provided_sig.ct_eq(&expected_sig).into() {
            Ok(Identity::new(claims.username, parse_groups(&claims.groups)))
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    /// Compute the HMAC-SHA256 signature over the canonical claim string.
    fn compute_signature(&self, claims: &[(&str, &str)]) -> String {
        let message = canonical_query(claims);

        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        let result = mac.finalize();

        hex::encode(result.into_bytes())
    }
}

#[async_trait]
impl Authenticator for SignedTokenAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingCredentials)?;
        self.verify(token)
    }
}

/// Claims decoded from a token, before verification.
struct TokenClaims {
    username: String,
    groups: String,
    expiry: u64,
    signature: String,
}

impl TokenClaims {
    fn parse(token: &str) -> Result<Self, AuthError> {
        let mut username: Option<String> = None;
        let mut groups: Option<String> = None;
        let mut expiry: Option<u64> = None;
        let mut signature: Option<String> = None;

        for (key, value) in form_urlencoded::parse(token.as_bytes()) {
            let slot_taken = match key.as_ref() {
                "user" => username.replace(value.into_owned()).is_some(),
                "groups" => groups.replace(value.into_owned()).is_some(),
                "sig" => signature.replace(value.into_owned()).is_some(),
                "exp" => {
                    let parsed = value
                        .parse::<u64>()
                        .map_err(|_| AuthError::InvalidToken("exp is not a timestamp".into()))?;
                    expiry.replace(parsed).is_some()
                }
                other => {
                    return Err(AuthError::InvalidToken(format!("unknown field '{}'", other)));
                }
            };
            if slot_taken {
                return Err(AuthError::InvalidToken(format!("duplicate field '{}'", key)));
            }
        }

        let username = username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("missing user".into()))?;
        let expiry = expiry.ok_or_else(|| AuthError::InvalidToken("missing exp".into()))?;
        let signature = signature.ok_or_else(|| AuthError::InvalidToken("missing sig".into()))?;

        Ok(Self {
            username,
            groups: groups.unwrap_or_default(),
            expiry,
            signature,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut pairs = params.to_vec();
    pairs.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cmp(b.1)));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware guarding protected routes.
///
/// On success the caller's [`Identity`] is inserted into the request
/// extensions; on failure the [`AuthError`] is returned as a 401 and the
/// inner handler is not called.
///
/// ```ignore
/// use axum::{Router, middleware, routing::get};
///
/// let app = Router::new()
///     .route("/api", get(ping_handler))
///     .layer(middleware::from_fn_with_state(authenticator, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(authenticator): State<SharedAuthenticator>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticator.authenticate(request.headers()).await?;

    debug!(
        username = %identity.username,
        groups = ?identity.groups,
        "Request authenticated"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Handlers receive the identity established by [`auth_middleware`].
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

// =============================================================================
// Tests
// =============================================================================
