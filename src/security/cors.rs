//! Permissive CORS headers on every response.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, HEAD, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Range, Content-Type";
pub const EXPOSE_HEADERS: &str = "Content-Length, Content-Range";

/// Wrap `router` so success, rejection and error responses alike carry the
/// CORS headers. Values set by handlers are overridden.
pub fn with_cors<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let headers = [
        (axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
        (axum::http::header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
        (axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
        (axum::http::header::ACCESS_CONTROL_EXPOSE_HEADERS, EXPOSE_HEADERS),
    ];

    headers
        .into_iter()
        .fold(router, |router, (name, value): (HeaderName, &'static str)| {
            router.layer(SetResponseHeaderLayer::overriding(
                name,
                HeaderValue::from_static(value),
            ))
        })
}

/// `OPTIONS` preflight answer.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
