//! `reqwest`-backed origin fetcher.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::redirect::Policy;
use reqwest::{Client, Method};

use crate::codec::FetchMethod;
use crate::config::FetchConfig;
use crate::fetch::{Fetch, FetchError, FetchRequest, OriginBody, OriginResponse};
use crate::security::targets::is_private_target;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Why the redirect policy refused to follow a `Location`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectStop {
    TooMany,
    PrivateTarget,
}

impl fmt::Display for RedirectStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectStop::TooMany => write!(f, "more than {} redirects", MAX_REDIRECTS),
            RedirectStop::PrivateTarget => f.write_str("redirect to an internal address"),
        }
    }
}

impl StdError for RedirectStop {}

/// Follow at most `MAX_REDIRECTS` hops and, when `deny_private` is set,
/// never into an internal address.
fn redirect_policy(deny_private: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error(RedirectStop::TooMany)
        } else if deny_private && is_private_target(attempt.url()) {
            tracing::warn!(location = %attempt.url(), "origin redirected to an internal address");
            attempt.error(RedirectStop::PrivateTarget)
        } else {
            attempt.follow()
        }
    })
}

/// Production fetcher. One pooled client is shared by all requests.
#[derive(Debug, Clone)]
pub struct OriginFetcher {
    client: Client,
}

impl OriginFetcher {
    /// `deny_private` applies the internal-network block to every redirect
    /// hop, not only to the first URL.
    pub fn new(config: &FetchConfig, deny_private: bool) -> Result<Self, FetchError> {
        // reqwest sends `Accept: */*` unless the header bag names an Accept.
        let client = Client::builder()
            .redirect(redirect_policy(deny_private))
            .no_proxy()
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for OriginFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<OriginResponse, FetchError> {
        let after_ms = request.timeout.as_millis() as u64;
        let method = match request.method {
            FetchMethod::Get => Method::GET,
            FetchMethod::Head => Method::HEAD,
        };

        let pending = self
            .client
            .request(method, request.url.clone())
            .headers(request.headers)
            .send();

        let response = tokio::time::timeout(request.timeout, pending)
            .await
            .map_err(|_| FetchError::Timeout { after_ms })?
            .map_err(|e| classify(e, after_ms, request.url.as_str()))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        tracing::debug!(
            target_url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            method = request.method.as_str(),
            "origin responded"
        );

        let body = match request.method {
            FetchMethod::Head => OriginBody::Empty,
            FetchMethod::Get => OriginBody::Stream(
                response
                    .bytes_stream()
                    .map_err(|e| {
                        tracing::debug!(error = %e, "origin body stream failed");
                        FetchError::BodyInterrupted
                    })
                    .boxed(),
            ),
        };

        Ok(OriginResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error, after_ms: u64, url: &str) -> FetchError {
    tracing::debug!(error = %err, target_url = %url, "origin request failed");

    if err.is_redirect() {
        match redirect_stop(&err) {
            Some(RedirectStop::PrivateTarget) => FetchError::ForbiddenRedirect,
            _ => FetchError::TooManyRedirects {
                limit: MAX_REDIRECTS,
            },
        }
    } else if err.is_timeout() {
        FetchError::Timeout { after_ms }
    } else if err.is_connect() {
        FetchError::ConnectionRefused
    } else if err.is_builder() {
        FetchError::Transport("request could not be built")
    } else {
        FetchError::Transport("request failed")
    }
}

fn redirect_stop(err: &reqwest::Error) -> Option<RedirectStop> {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(stop) = inner.downcast_ref::<RedirectStop>() {
            return Some(*stop);
        }
        source = inner.source();
    }
    None
}
