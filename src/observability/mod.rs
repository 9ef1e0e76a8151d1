//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gate / dispatch / handlers produce:
//!     → logging.rs (structured log events, request_id field)
//!     → metrics.rs (counters, histograms)
//!     → stats.rs   (in-process counters for /status)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//!     → GET /status
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Metrics and stats are atomic increments only

pub mod logging;
pub mod metrics;
pub mod stats;

pub use stats::{ProxyStats, StatsSnapshot};
