//! Protocol dispatch.
//!
//! # Data Flow
//! ```text
//! ProxyRequest ─► classify_target
//!                   ├─ Manifest ─► GET (or FTP) ─► manifest::render
//!                   ├─ Ftp ──────► FtpAdapter ──► passthrough::relay
//!                   ├─ File ─────► GET/HEAD ────► passthrough::relay
//!                   └─ Probe ────► GET/HEAD ────► HLS Content-Type? ─► manifest::render
//!                                                        └─ otherwise ─► passthrough::relay
//! ```
//!
//! # Responsibilities
//! - Pick the manifest, FTP or pass-through path for each request
//! - Build origin headers from the header bag, default User-Agent and Range
//! - Fall back to GET when an origin rejects HEAD
//!
//! # Design Decisions
//! - No retries and no de-duplication of concurrent fetches
//! - A manifest is always fetched in full with GET, HEAD included, so the
//!   declared length matches the rewritten body

pub mod classify;
pub mod ftp;
pub mod manifest;
pub mod passthrough;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::codec::{FetchMethod, ProxyEndpoint, ProxyRequest};
use crate::config::FetchConfig;
use crate::error::ProxyError;
use crate::fetch::{Fetch, FetchRequest, OriginResponse};
use crate::manifest::is_hls_content_type;

pub use classify::{classify_target, TargetClass};
pub use ftp::{FtpAdapter, FtpError, FtpResponse, UnavailableFtp};
use manifest::ManifestTarget;

/// Fetch-related settings the dispatcher applies to every request.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_manifest_bytes: usize,
}

impl From<&FetchConfig> for DispatchSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            max_manifest_bytes: config.max_manifest_bytes,
        }
    }
}

/// Everything dispatch needs about one inbound request.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub request: ProxyRequest,
    /// Where rewritten references point.
    pub endpoint: ProxyEndpoint,
    /// Inbound `Range`, forwarded on pass-through fetches.
    pub range: Option<HeaderValue>,
    pub request_id: String,
}

/// Which path served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Manifest,
    Passthrough,
    Ftp,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Manifest => "manifest",
            RouteKind::Passthrough => "passthrough",
            RouteKind::Ftp => "ftp",
        }
    }
}

#[derive(Debug)]
pub struct Dispatched {
    pub kind: RouteKind,
    pub response: Response,
}

/// Routes decoded requests to the right origin path.
pub struct Dispatcher {
    fetcher: Arc<dyn Fetch>,
    ftp: Arc<dyn FtpAdapter>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn Fetch>, ftp: Arc<dyn FtpAdapter>, settings: DispatchSettings) -> Self {
        Self {
            fetcher,
            ftp,
            settings,
        }
    }

    pub fn ftp_available(&self) -> bool {
        self.ftp.is_available()
    }

    pub async fn dispatch(&self, ctx: DispatchContext) -> Result<Dispatched, ProxyError> {
        let class = classify_target(&ctx.request);
        tracing::debug!(
            request_id = %ctx.request_id,
            target_url = %ctx.request.target,
            method = ctx.request.method.as_str(),
            class = ?class,
            "dispatching"
        );

        match class {
            TargetClass::Manifest => {
                let origin = self.fetch_manifest(&ctx).await?;
                let response = self.render_manifest(&ctx, origin).await?;
                Ok(Dispatched {
                    kind: RouteKind::Manifest,
                    response,
                })
            }
            TargetClass::Ftp => {
                let origin = self.fetch_ftp(&ctx).await?;
                Ok(Dispatched {
                    kind: RouteKind::Ftp,
                    response: passthrough::relay(origin, ctx.request.method)?,
                })
            }
            TargetClass::File => {
                let (origin, _) = self.fetch_passthrough(&ctx).await?;
                Ok(Dispatched {
                    kind: RouteKind::Passthrough,
                    response: passthrough::relay(origin, ctx.request.method)?,
                })
            }
            TargetClass::Probe => self.probe(&ctx).await,
        }
    }

    /// Fetch first and let the origin's content type decide.
    async fn probe(&self, ctx: &DispatchContext) -> Result<Dispatched, ProxyError> {
        let (origin, used) = self.fetch_passthrough(ctx).await?;

        let is_manifest = origin.status.is_success()
            && origin.content_type().is_some_and(is_hls_content_type);
        if !is_manifest {
            return Ok(Dispatched {
                kind: RouteKind::Passthrough,
                response: passthrough::relay(origin, ctx.request.method)?,
            });
        }

        // The probe may have been a HEAD or a ranged GET; either way the
        // playlist must be read in full.
        let origin = if used == FetchMethod::Get && ctx.range.is_none() {
            origin
        } else {
            self.fetch_manifest(ctx).await?
        };
        let response = self.render_manifest(ctx, origin).await?;
        Ok(Dispatched {
            kind: RouteKind::Manifest,
            response,
        })
    }

    async fn render_manifest(
        &self,
        ctx: &DispatchContext,
        origin: OriginResponse,
    ) -> Result<Response, ProxyError> {
        let target = ManifestTarget {
            endpoint: &ctx.endpoint,
            auth: &ctx.request.auth,
            headers: ctx.request.headers.as_ref(),
            method: ctx.request.method,
        };
        manifest::render(
            origin,
            target,
            self.settings.timeout,
            self.settings.max_manifest_bytes,
        )
        .await
    }

    /// Full-body GET of a playlist, through the FTP adapter for FTP targets.
    async fn fetch_manifest(&self, ctx: &DispatchContext) -> Result<OriginResponse, ProxyError> {
        if matches!(ctx.request.target.scheme(), "ftp" | "ftps") {
            return self.fetch_ftp(ctx).await;
        }
        let headers = self.origin_headers(ctx, false)?;
        self.fetch(ctx, FetchMethod::Get, headers).await
    }

    /// Fetch with the inbound method and Range. A HEAD rejected with 405 or
    /// 501 is retried once as GET. Returns the method actually used.
    async fn fetch_passthrough(
        &self,
        ctx: &DispatchContext,
    ) -> Result<(OriginResponse, FetchMethod), ProxyError> {
        let headers = self.origin_headers(ctx, true)?;
        let method = ctx.request.method;
        let origin = self.fetch(ctx, method, headers.clone()).await?;

        let head_rejected = matches!(
            origin.status,
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        );
        if method == FetchMethod::Head && head_rejected {
            tracing::debug!(
                request_id = %ctx.request_id,
                status = origin.status.as_u16(),
                "origin rejected HEAD, retrying as GET"
            );
            let origin = self.fetch(ctx, FetchMethod::Get, headers).await?;
            return Ok((origin, FetchMethod::Get));
        }
        Ok((origin, method))
    }

    async fn fetch(
        &self,
        ctx: &DispatchContext,
        method: FetchMethod,
        headers: HeaderMap,
    ) -> Result<OriginResponse, ProxyError> {
        let request = FetchRequest {
            url: ctx.request.target.clone(),
            method,
            headers,
            timeout: self.settings.timeout,
        };
        self.fetcher.fetch(request).await.map_err(|err| {
            tracing::warn!(
                request_id = %ctx.request_id,
                target_url = %ctx.request.target,
                error = %err,
                "origin fetch failed"
            );
            ProxyError::from(err)
        })
    }

    async fn fetch_ftp(&self, ctx: &DispatchContext) -> Result<OriginResponse, ProxyError> {
        let url = &ctx.request.target;
        let result = tokio::time::timeout(self.settings.timeout, self.ftp.fetch_ftp(url))
            .await
            .unwrap_or(Err(FtpError::Timeout));

        match result {
            Ok(response) => Ok(response.into_origin(url)),
            Err(err) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    target_url = %url,
                    error = %err,
                    "ftp adapter failed"
                );
                Err(err.into())
            }
        }
    }

    /// Header bag, default User-Agent and, when asked, the inbound Range.
    fn origin_headers(&self, ctx: &DispatchContext, with_range: bool) -> Result<HeaderMap, ProxyError> {
        let mut headers = match &ctx.request.headers {
            Some(bag) => bag.to_header_map(&self.settings.user_agent)?,
            None => {
                let mut headers = HeaderMap::new();
                if let Ok(ua) = HeaderValue::from_str(&self.settings.user_agent) {
                    headers.insert(header::USER_AGENT, ua);
                }
                headers
            }
        };

        if with_range {
            if let Some(range) = &ctx.range {
                headers.insert(header::RANGE, range.clone());
            }
        } else {
            headers.remove(header::RANGE);
        }
        Ok(headers)
    }
}
