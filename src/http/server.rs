//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the proxy, health and status handlers
//! - Wire up middleware (request ID, tracing, CORS, concurrency limit)
//! - Put the request gate in front of the proxy route only
//! - Serve on a bound listener until shutdown is signalled

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::dispatch::{DispatchSettings, Dispatcher, FtpAdapter, UnavailableFtp};
use crate::fetch::{Fetch, FetchError, OriginFetcher};
use crate::http::handlers::proxy_handler;
use crate::http::request::X_REQUEST_ID;
use crate::http::status::{health_handler, status_handler};
use crate::observability::ProxyStats;
use crate::security::cors::{preflight, with_cors};
use crate::security::{gate_middleware, Gate};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub stats: Arc<ProxyStats>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
}

impl HttpServer {
    /// Create a server that fetches origins with `reqwest` and has no FTP
    /// transport.
    pub fn new(config: RelayConfig) -> Result<Self, FetchError> {
        let fetcher = OriginFetcher::new(&config.fetch, config.security.deny_private_targets)?;
        Ok(Self::with_components(
            config,
            Arc::new(fetcher),
            Arc::new(UnavailableFtp),
        ))
    }

    /// Create a server around caller-supplied origin and FTP adapters.
    pub fn with_components(
        config: RelayConfig,
        fetcher: Arc<dyn Fetch>,
        ftp: Arc<dyn FtpAdapter>,
    ) -> Self {
        let config = Arc::new(config);
        let stats = Arc::new(ProxyStats::new());
        let dispatcher = Arc::new(Dispatcher::new(
            fetcher,
            ftp,
            DispatchSettings::from(&config.fetch),
        ));
        let gate = Arc::new(Gate::new(&config.proxy, &config.security, stats.clone()));

        let state = AppState {
            config: config.clone(),
            dispatcher,
            stats,
        };

        let router = Self::build_router(&config, state, gate);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState, gate: Arc<Gate>) -> Router {
        let prefix = config.proxy.route_prefix();

        let proxy_routes = Router::new()
            .route(
                &format!("{prefix}/proxy"),
                get(proxy_handler).options(preflight),
            )
            .route_layer(middleware::from_fn_with_state(gate, gate_middleware));

        let app = Router::new()
            .route(&format!("{prefix}/health"), get(health_handler))
            .route(&format!("{prefix}/status"), get(status_handler))
            .merge(proxy_routes)
            .with_state(state);

        with_cors(app)
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                // Path only: the query carries the auth code.
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            route_prefix = %self.config.proxy.route_prefix(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
