//! HLS relay.
//!
//! A content proxy built with Tokio and Axum that fetches remote media for
//! its clients and rewrites HLS playlists so every reference they contain
//! comes back through the relay with the same auth code and headers.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                       RELAY                           │
//!                        │                                                       │
//!   Client Request       │  ┌──────────┐   ┌──────────┐   ┌──────────────┐       │
//!   ─────────────────────┼─▶│  http    │──▶│ security │──▶│   dispatch   │       │
//!                        │  │  server  │   │   gate   │   │  classifier  │       │
//!                        │  └──────────┘   └──────────┘   └──────┬───────┘       │
//!                        │                                       │               │
//!                        │               ┌───────────────────────┼──────────┐    │
//!                        │               ▼                       ▼          ▼    │
//!                        │        ┌────────────┐         ┌────────────┐ ┌─────┐  │
//!                        │        │  manifest  │◀───────▶│   fetch    │ │ ftp │  │
//!                        │        │  rewriter  │  codec  │  (reqwest) │ │adapt│  │
//!                        │        └────────────┘         └─────┬──────┘ └─────┘  │
//!   Client Response      │                                     │                 │
//!   ◀────────────────────┼─────────── CORS headers ◀───────────┘◀──────── Origin │
//!                        │                                                       │
//!                        │  config · observability · lifecycle                   │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use hls_relay::config::schema::DEFAULT_AUTH_CODE;
use hls_relay::config::validation::validate_config;
use hls_relay::config::{resolve_config, ConfigError};
use hls_relay::lifecycle::{spawn_signal_listener, Shutdown};
use hls_relay::observability::{logging, metrics};
use hls_relay::HttpServer;

#[derive(Parser)]
#[command(name = "hls-relay")]
#[command(about = "HLS-aware content relay", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override proxy.auth_code
    #[arg(short, long)]
    auth: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(auth) = args.auth {
        config.proxy.auth_code = auth;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hls-relay starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        fetch_timeout_ms = config.fetch.timeout_ms,
        public_base_url = config.proxy.public_base_url.as_deref().unwrap_or("(derived)"),
        route_prefix = %config.proxy.route_prefix(),
        "Configuration loaded"
    );
    if config.proxy.auth_code == DEFAULT_AUTH_CODE {
        tracing::warn!("proxy.auth_code is the shipped placeholder; set PROXY_AUTH");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
