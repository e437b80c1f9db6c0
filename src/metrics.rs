//! Runtime metrics for the suggestion server
//!
//! Counters are lock-free atomics bumped on the request path; per-operation
//! latencies go into a `DashMap` keyed by operation name, keeping the most
//! recent [`MAX_TIMING_SAMPLES`] per operation. The server logs a summary on
//! shutdown.
//!
//! ## Tracked
//!
//! - Queries received, empty queries short-circuited, suggestions served
//! - Lookup failures and malformed payloads
//! - Connections opened and closed
//! - Ranking latency (via [`TimingGuard`])

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Latency samples kept per operation; older samples are evicted first
pub const MAX_TIMING_SAMPLES: usize = 10_000;

/// Global metrics registry
static METRICS: once_cell::sync::Lazy<Arc<Metrics>> = once_cell::sync::Lazy::new(|| {
    Arc::new(Metrics::new())
});

/// Get the global metrics instance
pub fn metrics() -> &'static Arc<Metrics> {
    &METRICS
}

#[derive(Debug)]
pub struct Metrics {
    queries_received: AtomicU64,
    empty_queries: AtomicU64,
    suggestions_served: AtomicU64,
    lookup_failures: AtomicU64,
    malformed_payloads: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,

    // operation name -> most recent durations in microseconds
    operation_timings: DashMap<String, VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            queries_received: AtomicU64::new(0),
            empty_queries: AtomicU64::new(0),
            suggestions_served: AtomicU64::new(0),
            lookup_failures: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            operation_timings: DashMap::new(),
        }
    }

    pub fn record_query(&self) {
        self.queries_received.fetch_add(1, Ordering::Relaxed);
    }

    /// A query that was blank after trimming and never reached the store
    pub fn record_empty_query(&self) {
        self.empty_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Records how many candidates were returned for one query
    pub fn record_suggestions(&self, count: usize) {
        self.suggestions_served.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_lookup_failure(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_payload(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Connections currently open
    pub fn active_connections(&self) -> u64 {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    pub fn record_timing(&self, operation: &str, duration: Duration) {
        let micros = duration.as_micros() as u64;

        let mut samples = self.operation_timings.entry(operation.to_string()).or_default();
        if samples.len() >= MAX_TIMING_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(micros);
    }

    /// Latency percentiles for one operation, `None` if it was never timed
    pub fn operation_stats(&self, operation: &str) -> Option<OperationStats> {
        let timings = self.operation_timings.get(operation)?;
        let mut sorted: Vec<u64> = timings.value().iter().copied().collect();
        drop(timings);

        if sorted.is_empty() {
            return Some(OperationStats::default());
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        Some(OperationStats {
            count,
            min_micros: sorted[0],
            max_micros: sorted[count - 1],
            mean_micros: sorted.iter().sum::<u64>() / count as u64,
            p50_micros: sorted[count / 2],
            p95_micros: percentile(0.95),
            p99_micros: percentile(0.99),
        })
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            queries_received: self.queries_received.load(Ordering::Relaxed),
            empty_queries: self.empty_queries.load(Ordering::Relaxed),
            suggestions_served: self.suggestions_served.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
        }
    }

    /// Resets all metrics (useful for testing)
    pub fn reset(&self) {
        self.queries_received.store(0, Ordering::Relaxed);
        self.empty_queries.store(0, Ordering::Relaxed);
        self.suggestions_served.store(0, Ordering::Relaxed);
        self.lookup_failures.store(0, Ordering::Relaxed);
        self.malformed_payloads.store(0, Ordering::Relaxed);
        self.connections_opened.store(0, Ordering::Relaxed);
        self.connections_closed.store(0, Ordering::Relaxed);
        self.operation_timings.clear();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub count: usize,
    pub min_micros: u64,
    pub max_micros: u64,
    pub mean_micros: u64,
    pub p50_micros: u64,  // Median
    pub p95_micros: u64,
    pub p99_micros: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub queries_received: u64,
    pub empty_queries: u64,
    pub suggestions_served: u64,
    pub lookup_failures: u64,
    pub malformed_payloads: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
}

/// RAII guard that records the duration of a scope into the global registry
///
/// ```
/// use trigram_suggest::metrics::TimingGuard;
///
/// fn rank_something() {
///     let _guard = TimingGuard::new("rank");
///     // ... work ...
/// }
/// ```
pub struct TimingGuard {
    operation: &'static str,
    start: Instant,
}

impl TimingGuard {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        metrics().record_timing(self.operation, self.start.elapsed());
    }
}
