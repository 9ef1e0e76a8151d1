//! Request-level errors and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::codec::DecodeError;
use crate::fetch::FetchError;
use crate::manifest::RewriteError;

/// Everything that can stop a proxy request from producing origin content.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid or missing auth code")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] DecodeError),

    #[error("header bag exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },

    #[error("target host is not allowed")]
    Forbidden,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("manifest could not be rewritten: {0}")]
    Rewrite(#[from] RewriteError),

    /// Failure reported by a protocol adapter, already mapped to a status.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::Validation(_) | ProxyError::HeadersTooLarge { .. } => StatusCode::BAD_REQUEST,
            ProxyError::Forbidden => StatusCode::FORBIDDEN,
            ProxyError::Fetch(err) => err.status(),
            ProxyError::Rewrite(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Upstream { status, .. } => *status,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::Unauthorized => "unauthorized",
            ProxyError::Validation(_) => "invalid_request",
            ProxyError::HeadersTooLarge { .. } => "headers_too_large",
            ProxyError::Forbidden => "forbidden_target",
            ProxyError::Fetch(err) => err.code(),
            ProxyError::Rewrite(_) => "invalid_manifest",
            ProxyError::Upstream { .. } => "upstream_error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_mapping() {
        assert_eq!(ProxyError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ProxyError::from(DecodeError::MissingUrl).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::HeadersTooLarge { limit: 8192 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ProxyError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ProxyError::from(FetchError::Timeout { after_ms: 1 }).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ProxyError::from(RewriteError::InvalidEncoding).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::Upstream {
                status: StatusCode::NOT_FOUND,
                message: "ftp file not found".into()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn renders_short_json_body() {
        let response = ProxyError::from(DecodeError::MissingUrl).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], "invalid_request");
        assert_eq!(value["error"], "missing required parameter: url");
    }
}
