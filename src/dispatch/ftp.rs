//! FTP adapter contract.
//!
//! The FTP transport lives outside the relay. The dispatcher only needs a
//! byte stream plus metadata for a URL, and a small error vocabulary it can
//! turn into HTTP statuses.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use thiserror::Error;
use url::Url;

use crate::error::ProxyError;
use crate::fetch::{OriginBody, OriginResponse};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FtpError {
    #[error("ftp server unreachable")]
    ConnectFailed,

    #[error("ftp login rejected")]
    AuthFailed,

    #[error("ftp file not found")]
    NotFound,

    #[error("ftp transfer timed out")]
    Timeout,
}

impl FtpError {
    pub fn status(&self) -> StatusCode {
        match self {
            FtpError::ConnectFailed | FtpError::AuthFailed => StatusCode::BAD_GATEWAY,
            FtpError::NotFound => StatusCode::NOT_FOUND,
            FtpError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<FtpError> for ProxyError {
    fn from(err: FtpError) -> Self {
        ProxyError::Upstream {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// What an adapter returns for a successful fetch.
#[derive(Debug)]
pub struct FtpResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: OriginBody,
}

impl FtpResponse {
    /// View the adapter result as an origin response for `url`.
    pub fn into_origin(self, url: &Url) -> OriginResponse {
        let mut headers = HeaderMap::new();
        if let Some(value) = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Some(len) = self.content_length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        OriginResponse {
            status: self.status,
            final_url: url.clone(),
            headers,
            body: self.body,
        }
    }
}

/// Stream fetch of `ftp://` and `ftps://` resources.
#[async_trait]
pub trait FtpAdapter: Send + Sync {
    async fn fetch_ftp(&self, url: &Url) -> Result<FtpResponse, FtpError>;

    /// Whether the adapter can currently serve requests. Reported on `/status`.
    fn is_available(&self) -> bool {
        true
    }
}

/// Adapter used when no FTP transport is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFtp;

#[async_trait]
impl FtpAdapter for UnavailableFtp {
    async fn fetch_ftp(&self, url: &Url) -> Result<FtpResponse, FtpError> {
        tracing::debug!(target_url = %url, "no ftp transport configured");
        Err(FtpError::ConnectFailed)
    }

    fn is_available(&self) -> bool {
        false
    }
}
