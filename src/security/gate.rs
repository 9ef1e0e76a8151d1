//! Request gate for the proxy route.
//!
//! # Responsibilities
//! - Reject a wrong or missing auth code before anything else is decoded
//! - Decode and validate the query into a `ProxyRequest`
//! - Enforce the header bag size cap and the internal-network block
//!
//! # Design Decisions
//! - Runs as route middleware so rejected requests never reach dispatch
//! - The decoded request travels to the handler as a request extension

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::codec::{self, ProxyRequest};
use crate::config::{ProxySettings, SecurityConfig};
use crate::error::ProxyError;
use crate::observability::{metrics, ProxyStats};
use crate::security::targets::is_private_target;

/// Gate settings plus the stats it reports rejections to.
#[derive(Debug)]
pub struct Gate {
    secret: String,
    max_header_bag_bytes: usize,
    deny_private_targets: bool,
    stats: Arc<ProxyStats>,
}

impl Gate {
    pub fn new(proxy: &ProxySettings, security: &SecurityConfig, stats: Arc<ProxyStats>) -> Self {
        Self {
            secret: proxy.auth_code.clone(),
            max_header_bag_bytes: security.max_header_bag_bytes,
            deny_private_targets: security.deny_private_targets,
            stats,
        }
    }

    /// Run every check against a raw query string.
    pub fn check(&self, query: &str) -> Result<ProxyRequest, ProxyError> {
        authorize(query, &self.secret)?;
        let request = codec::decode_query(query)?;

        if let Some(bag) = &request.headers {
            if bag.to_json().len() > self.max_header_bag_bytes {
                return Err(ProxyError::HeadersTooLarge {
                    limit: self.max_header_bag_bytes,
                });
            }
        }

        if self.deny_private_targets && is_private_target(&request.target) {
            return Err(ProxyError::Forbidden);
        }

        Ok(request)
    }
}

/// Compare the first `auth` parameter with the configured secret without
/// decoding anything else.
pub fn authorize(query: &str, secret: &str) -> Result<(), ProxyError> {
    let supplied = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "auth")
        .map(|(_, value)| value);

    match supplied {
        Some(value) if constant_time_eq(value.as_bytes(), secret.as_bytes()) => Ok(()),
        _ => Err(ProxyError::Unauthorized),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware for the proxy route. `OPTIONS` preflights pass untouched.
pub async fn gate_middleware(
    State(gate): State<Arc<Gate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let query = request.uri().query().unwrap_or_default();
    match gate.check(query) {
        Ok(proxy_request) => {
            request.extensions_mut().insert(proxy_request);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(
                path = %request.uri().path(),
                status = err.status().as_u16(),
                reason = err.code(),
                "proxy request rejected"
            );
            gate.stats.record_rejected();
            metrics::record_rejected(err.code());
            err.into_response()
        }
    }
}
