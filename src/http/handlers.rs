//! The `/proxy` handler.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Extension,
};

use crate::codec::{FetchMethod, ProxyRequest};
use crate::dispatch::DispatchContext;
use crate::http::request::{proxy_endpoint, request_id};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Serve a request the gate has already authorized and decoded.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Extension(proxy_request): Extension<ProxyRequest>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let _in_flight = state.stats.begin();
    let request_id = request_id(&headers);

    let fetch_method = if method == Method::HEAD {
        FetchMethod::Head
    } else {
        FetchMethod::Get
    };

    let ctx = DispatchContext {
        request: proxy_request.with_method(fetch_method),
        endpoint: proxy_endpoint(&headers, &uri, &state.config.proxy),
        range: headers.get(header::RANGE).cloned(),
        request_id: request_id.clone(),
    };

    match state.dispatcher.dispatch(ctx).await {
        Ok(dispatched) => {
            let status = dispatched.response.status();
            state.stats.record_route(dispatched.kind);
            metrics::record_request(method.as_str(), status.as_u16(), dispatched.kind.as_str(), start);
            tracing::info!(
                request_id = %request_id,
                status = status.as_u16(),
                kind = dispatched.kind.as_str(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "proxy request served"
            );
            dispatched.response
        }
        Err(err) => {
            state.stats.record_upstream_failure();
            metrics::record_request(method.as_str(), err.status().as_u16(), "error", start);
            tracing::warn!(
                request_id = %request_id,
                status = err.status().as_u16(),
                code = err.code(),
                error = %err,
                "proxy request failed"
            );
            err.into_response()
        }
    }
}
