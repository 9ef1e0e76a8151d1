//! Origin fetch failures.

use axum::http::StatusCode;
use thiserror::Error;

/// Failures talking to an origin. Messages are short diagnostics; the
/// underlying transport error is logged, never returned to clients.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response headers within the per-request bound.
    #[error("origin did not respond within {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("origin exceeded {limit} redirects")]
    TooManyRedirects { limit: usize },

    /// A redirect pointed at an internal address while those are denied.
    #[error("origin redirected to a forbidden target")]
    ForbiddenRedirect,

    #[error("could not connect to origin")]
    ConnectionRefused,

    #[error("origin body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("origin body was interrupted")]
    BodyInterrupted,

    #[error("origin request failed: {0}")]
    Transport(&'static str),

    /// The HTTP client itself could not be built.
    #[error("fetcher setup failed: {0}")]
    Setup(String),
}

impl FetchError {
    pub fn status(&self) -> StatusCode {
        match self {
            FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            FetchError::ForbiddenRedirect => StatusCode::FORBIDDEN,
            FetchError::Setup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code for error bodies and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "origin_timeout",
            FetchError::TooManyRedirects { .. } => "too_many_redirects",
            FetchError::ForbiddenRedirect => "forbidden_redirect",
            FetchError::ConnectionRefused => "connection_refused",
            FetchError::BodyTooLarge { .. } => "body_too_large",
            FetchError::BodyInterrupted => "body_interrupted",
            FetchError::Transport(_) => "transport",
            FetchError::Setup(_) => "setup",
        }
    }
}
