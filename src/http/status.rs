//! Liveness and status endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::observability::StatsSnapshot;

pub const SERVICE_NAME: &str = "hls-relay";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// `GET /health`. Always 200 while the process serves requests.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub route_prefix: String,
    pub features: Vec<&'static str>,
    pub ftp_available: bool,
    pub stats: StatsSnapshot,
}

/// `GET /status`. Counters are best-effort.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        route_prefix: state.config.proxy.route_prefix(),
        features: vec![
            "hls-manifest-rewrite",
            "passthrough-streaming",
            "range-forwarding",
            "head-fallback",
            "header-bag-forwarding",
            "ftp-adapter",
        ],
        ftp_available: state.dispatcher.ftp_available(),
        stats: state.stats.snapshot(),
    })
}
