//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound requests by method, status, route
//! - `relay_request_duration_seconds` (histogram): inbound latency
//! - `relay_retries_total` (counter): retries by failure kind
//! - `relay_failures_total` (counter): failed relays by failure kind
//!
//! # Design Decisions
//! - Updates go through the `metrics` facade and are no-ops until an
//!   exporter is installed
//! - [`RelayStats`] keeps plain atomic totals for the diagnostics endpoint

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Serialize;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &Method, status: u16, route: &str, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(kind: &'static str) {
    metrics::counter!("relay_retries_total", "kind" => kind).increment(1);
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("relay_failures_total", "kind" => kind).increment(1);
}

/// Process-wide totals, updated lock-free from every request task.
#[derive(Debug, Default)]
pub struct RelayStats {
    requests: AtomicU64,
    upstream_attempts: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    not_found: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub upstream_attempts: u64,
    pub retries: u64,
    pub failures: u64,
    pub not_found: u64,
    pub rejected: u64,
}

impl RelayStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.upstream_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            upstream_attempts: self.upstream_attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
