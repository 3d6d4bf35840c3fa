//! Redirect from the application root to the single-page app entry point.
//!
//! Behind a reverse proxy the `Host` the server sees is not the one the
//! browser used, so the redirect target is rebuilt from `X-Forwarded-Host`
//! and `X-Forwarded-Proto`:
//!
//! | x-forwarded-host | x-forwarded-proto | Location                  |
//! |------------------|-------------------|---------------------------|
//! | `a.com, b.com`   | `https`           | `https://a.com/index.html` |
//! | `a.com`          | absent            | `http://a.com/index.html`  |
//! | absent           | any               | `/index.html`              |
//! | ` , b.com`       | any               | `/index.html`              |
//!
//! An empty first entry counts as absent rather than producing a URL with an
//! empty host.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::info;

/// Path of the single-page app entry point.
pub const INDEX_PATH: &str = "/index.html";

/// Scheme used when the proxy does not say which one the client used.
pub const DEFAULT_SCHEME: &str = "http";

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Client-facing host from `X-Forwarded-Host`.
///
/// Each proxy in a chain appends its own entry, so the first one is the host
/// the client asked for.
pub fn forwarded_host(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, FORWARDED_HOST)?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|host| !host.is_empty())
}

/// Client-facing scheme from `X-Forwarded-Proto`.
pub fn forwarded_proto(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, FORWARDED_PROTO)
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
}

/// Compute the `Location` for a request to the application root.
pub fn resolve_redirect(headers: &HeaderMap) -> String {
    match forwarded_host(headers) {
        Some(host) => {
            let proto = forwarded_proto(headers).unwrap_or(DEFAULT_SCHEME);
            format!("{}://{}{}", proto, host, INDEX_PATH)
        }
        None => INDEX_PATH.to_string(),
    }
}

/// Redirect `GET /` to the app entry point with `302 Found`.
///
/// # Endpoint
///
/// `GET /`
pub async fn index_redirect_handler(headers: HeaderMap) -> Response {
    let destination = resolve_redirect(&headers);

    let header_list: Vec<(&str, &str)> = headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("<binary>")))
        .collect();
    info!(
        headers = ?header_list,
        destination = %destination,
        "Redirecting to app entry point"
    );

    found(&destination)
}

/// `302 Found` response to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// =============================================================================
// Tests
// =============================================================================
