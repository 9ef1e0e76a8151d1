//! Process-level counters reported on `/status`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::dispatch::RouteKind;

/// Best-effort request counters. Relaxed ordering; readers may see values
/// from slightly different instants.
#[derive(Debug)]
pub struct ProxyStats {
    started: Instant,
    requests: AtomicU64,
    manifests: AtomicU64,
    passthrough: AtomicU64,
    ftp: AtomicU64,
    rejected: AtomicU64,
    upstream_failures: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub manifests_rewritten: u64,
    pub passthrough: u64,
    pub ftp: u64,
    pub rejected: u64,
    pub upstream_failures: u64,
    pub in_flight: u64,
}

impl Default for ProxyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            manifests: AtomicU64::new(0),
            passthrough: AtomicU64::new(0),
            ftp: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    /// Count a request and track it as in flight until the guard drops.
    pub fn begin(&self) -> InFlight<'_> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlight { stats: self }
    }

    pub fn record_route(&self, kind: RouteKind) {
        let counter = match kind {
            RouteKind::Manifest => &self.manifests,
            RouteKind::Passthrough => &self.passthrough,
            RouteKind::Ftp => &self.ftp,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            requests: self.requests.load(Ordering::Relaxed),
            manifests_rewritten: self.manifests.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
            ftp: self.ftp.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Decrements the in-flight gauge on drop, including when the client goes
/// away mid-request.
#[derive(Debug)]
pub struct InFlight<'a> {
    stats: &'a ProxyStats,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
