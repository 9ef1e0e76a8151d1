//! Origin fetching.
//!
//! # Responsibilities
//! - Issue GET/HEAD to the real origin with exactly the caller's headers
//! - Follow redirects up to a fixed bound and report the final URL
//! - Bound time-to-response per request
//! - Hand back status, headers and a streaming or buffered body
//!
//! # Design Decisions
//! - `Fetch` is the seam between dispatch and the network; tests swap in spies
//! - Non-2xx is a normal response, not an error
//! - The timeout covers the response head; manifest body reads are bounded
//!   by the dispatcher, pass-through bodies stream for as long as the client
//!   keeps reading

pub mod client;
pub mod error;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use url::Url;

use crate::codec::FetchMethod;

pub use client::{OriginFetcher, MAX_REDIRECTS};
pub use error::FetchError;

/// One outbound request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: FetchMethod,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

/// Fetches origin resources.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<OriginResponse, FetchError>;
}

/// Response body from an origin.
pub enum OriginBody {
    Empty,
    Bytes(Bytes),
    Stream(BoxStream<'static, Result<Bytes, FetchError>>),
}

impl fmt::Debug for OriginBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginBody::Empty => f.write_str("Empty"),
            OriginBody::Bytes(bytes) => write!(f, "Bytes({})", bytes.len()),
            OriginBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl OriginBody {
    pub fn into_axum_body(self) -> Body {
        match self {
            OriginBody::Empty => Body::empty(),
            OriginBody::Bytes(bytes) => Body::from(bytes),
            OriginBody::Stream(stream) => Body::from_stream(stream),
        }
    }
}

/// Status, headers and body as the origin sent them.
#[derive(Debug)]
pub struct OriginResponse {
    pub status: StatusCode,
    /// URL after redirects; relative manifest references resolve against it.
    pub final_url: Url,
    pub headers: HeaderMap,
    pub body: OriginBody,
}

impl OriginResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Buffer the whole body, failing once it grows past `limit` bytes.
    pub async fn into_bytes(self, limit: usize) -> Result<Bytes, FetchError> {
        if self.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::BodyTooLarge { limit });
        }
        match self.body {
            OriginBody::Empty => Ok(Bytes::new()),
            OriginBody::Bytes(bytes) if bytes.len() > limit => {
                Err(FetchError::BodyTooLarge { limit })
            }
            OriginBody::Bytes(bytes) => Ok(bytes),
            OriginBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if buf.len() + chunk.len() > limit {
                        return Err(FetchError::BodyTooLarge { limit });
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(buf.freeze())
            }
        }
    }
}
