//! Rendering a fetched playlist as a rewritten response.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;

use crate::codec::{FetchMethod, HeaderBag, ProxyEndpoint};
use crate::dispatch::passthrough;
use crate::error::ProxyError;
use crate::fetch::{FetchError, OriginResponse};
use crate::manifest::{Rewriter, HLS_CONTENT_TYPE};
use crate::observability::metrics;

/// What the rewriter needs from the inbound request.
pub struct ManifestTarget<'a> {
    pub endpoint: &'a ProxyEndpoint,
    pub auth: &'a str,
    pub headers: Option<&'a HeaderBag>,
    pub method: FetchMethod,
}

/// Buffer, rewrite against the post-redirect URL and build the response.
///
/// Non-2xx origins are relayed raw. Bodies that are not UTF-8 fail the
/// request instead of being served unrewritten.
pub async fn render(
    origin: OriginResponse,
    target: ManifestTarget<'_>,
    read_timeout: Duration,
    max_bytes: usize,
) -> Result<Response, ProxyError> {
    if !origin.status.is_success() {
        tracing::debug!(status = origin.status.as_u16(), "manifest origin not successful, relaying raw");
        return passthrough::relay(origin, target.method);
    }

    let status = origin.status;
    let base = origin.final_url.clone();
    let after_ms = read_timeout.as_millis() as u64;
    let bytes = tokio::time::timeout(read_timeout, origin.into_bytes(max_bytes))
        .await
        .map_err(|_| FetchError::Timeout { after_ms })??;

    let rewritten = Rewriter::new(target.endpoint, target.auth, target.headers)
        .rewrite_bytes(&bytes, &base)?;
    metrics::record_manifest_rewrite(rewritten.rewritten);

    let length = rewritten.text.len();
    let body = match target.method {
        FetchMethod::Head => Body::empty(),
        FetchMethod::Get => Body::from(rewritten.text),
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(HLS_CONTENT_TYPE))
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header(header::CONTENT_LENGTH, length)
        .body(body)
        .map_err(|_| ProxyError::from(FetchError::Transport("response could not be built")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::OriginBody;
    use crate::manifest::RewriteError;
    use axum::body::to_bytes;
    use axum::http::{HeaderMap, StatusCode};
    use bytes::Bytes;
    use url::Url;

    fn origin(status: StatusCode, body: &'static [u8]) -> OriginResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        OriginResponse {
            status,
            final_url: Url::parse("https://cdn.example/moved/index.m3u8").unwrap(),
            headers,
            body: OriginBody::Bytes(Bytes::from_static(body)),
        }
    }

    fn target<'a>(endpoint: &'a ProxyEndpoint, method: FetchMethod) -> ManifestTarget<'a> {
        ManifestTarget {
            endpoint,
            auth: "code",
            headers: None,
            method,
        }
    }

    #[tokio::test]
    async fn rewrites_against_final_url() {
        let endpoint = ProxyEndpoint::new("https://relay.example", "");
        let response = render(
            origin(StatusCode::OK, b"#EXTM3U\nseg.ts\n"),
            target(&endpoint, FetchMethod::Get),
            Duration::from_secs(1),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], HLS_CONTENT_TYPE);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        let declared: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        assert_eq!(declared, body.len());
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("url=https%3A%2F%2Fcdn.example%2Fmoved%2Fseg.ts"));
    }

    #[tokio::test]
    async fn head_reports_rewritten_length() {
        let endpoint = ProxyEndpoint::new("https://relay.example", "");
        let input: &'static [u8] = b"#EXTM3U\nseg.ts\n";
        let response = render(
            origin(StatusCode::OK, input),
            target(&endpoint, FetchMethod::Head),
            Duration::from_secs(1),
            1024,
        )
        .await
        .unwrap();

        let declared: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(declared > input.len());
        assert!(to_bytes(response.into_body(), 64).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_passes_through_raw() {
        let endpoint = ProxyEndpoint::new("https://relay.example", "");
        let response = render(
            origin(StatusCode::NOT_FOUND, b"seg.ts is gone"),
            target(&endpoint, FetchMethod::Get),
            Duration::from_secs(1),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let body = to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"seg.ts is gone");
    }

    #[tokio::test]
    async fn invalid_utf8_fails() {
        let endpoint = ProxyEndpoint::new("https://relay.example", "");
        let err = render(
            origin(StatusCode::OK, b"#EXTM3U\n\xc3\x28\n"),
            target(&endpoint, FetchMethod::Get),
            Duration::from_secs(1),
            1024,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProxyError::Rewrite(RewriteError::InvalidEncoding)));
    }

    #[tokio::test]
    async fn oversized_manifest_fails() {
        let endpoint = ProxyEndpoint::new("https://relay.example", "");
        let err = render(
            origin(StatusCode::OK, b"#EXTM3U\nseg.ts\n"),
            target(&endpoint, FetchMethod::Get),
            Duration::from_secs(1),
            4,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProxyError::Fetch(FetchError::BodyTooLarge { limit: 4 })));
    }
}
