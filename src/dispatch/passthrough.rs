//! Streaming origin responses back unchanged.

use axum::body::Body;
use axum::http::{header, HeaderName};
use axum::response::Response;

use crate::codec::FetchMethod;
use crate::error::ProxyError;
use crate::fetch::{FetchError, OriginResponse};

/// Origin headers copied onto relayed responses.
pub const FORWARDED_HEADERS: [HeaderName; 8] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::LAST_MODIFIED,
    header::ETAG,
    header::CACHE_CONTROL,
    header::EXPIRES,
];

/// Relay status, the forwarded header set and the body as-is. HEAD
/// responses keep the origin's declared length but carry no body.
pub fn relay(origin: OriginResponse, method: FetchMethod) -> Result<Response, ProxyError> {
    let mut builder = Response::builder().status(origin.status);

    if let Some(headers) = builder.headers_mut() {
        for name in FORWARDED_HEADERS {
            for value in origin.headers.get_all(&name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    let body = match method {
        FetchMethod::Head => Body::empty(),
        FetchMethod::Get => origin.body.into_axum_body(),
    };

    builder
        .body(body)
        .map_err(|_| ProxyError::from(FetchError::Transport("response could not be built")))
}
