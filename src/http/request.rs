//! Inbound request helpers.
//!
//! # Responsibilities
//! - Read the request ID assigned by the middleware stack
//! - Work out the externally visible base URL for rewritten references
//!
//! # Design Decisions
//! - A configured `public_base_url` always wins over forwarded headers
//! - Forwarded values that do not look like a scheme or an authority are
//!   ignored rather than spliced into generated URLs

use axum::http::{header, HeaderMap, Uri};

use crate::codec::ProxyEndpoint;
use crate::config::ProxySettings;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Request ID set by `SetRequestIdLayer`, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// `scheme://authority` the client used to reach the relay.
pub fn proxy_base_url(headers: &HeaderMap, uri: &Uri, configured: Option<&str>) -> String {
    if let Some(base) = configured {
        return base.trim_end_matches('/').to_string();
    }

    let proto = first_value(headers, X_FORWARDED_PROTO)
        .map(|p| p.to_ascii_lowercase())
        .filter(|p| p == "http" || p == "https")
        .unwrap_or_else(|| "http".to_string());

    let host = first_value(headers, X_FORWARDED_HOST)
        .filter(|h| is_authority(h))
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|h| is_authority(h))
                .map(str::to_string)
        })
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string());

    format!("{proto}://{host}")
}

/// Endpoint new proxy URLs point at for this request.
pub fn proxy_endpoint(headers: &HeaderMap, uri: &Uri, settings: &ProxySettings) -> ProxyEndpoint {
    let base = proxy_base_url(headers, uri, settings.public_base_url.as_deref());
    ProxyEndpoint::new(&base, &settings.route_prefix)
}

fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_authority(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\'))
}
