//! Lock-light metrics collection.
//!
//! Counters are atomics; request latencies go into a bounded ring so
//! percentile reads stay O(n log n) over a fixed window.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use exthub_core::types::MetricsSnapshot;

const LATENCY_WINDOW: usize = 1024;

#[derive(Default)]
struct ModuleMetrics {
    request_count: AtomicU64,
    error_count: AtomicU64,
    hooks_executed: AtomicU64,
    db_query_count: AtomicU64,
    db_query_micros: AtomicU64,
    latencies_ms: Mutex<Vec<f64>>,
}

/// Aggregates counters and latency samples per extension.
#[derive(Default)]
pub struct MetricsCollector {
    modules: DashMap<String, ModuleMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_module<R>(&self, module: &str, f: impl FnOnce(&ModuleMetrics) -> R) -> R {
        let entry = self.modules.entry(module.to_string()).or_default();
        f(entry.value())
    }

    /// Record one completed request and its latency.
    pub fn record_request(&self, module: &str, latency: Duration, is_error: bool) {
        self.with_module(module, |m| {
            m.request_count.fetch_add(1, Ordering::Relaxed);
            if is_error {
                m.error_count.fetch_add(1, Ordering::Relaxed);
            }
            let mut latencies = m
                .latencies_ms
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if latencies.len() == LATENCY_WINDOW {
                latencies.remove(0);
            }
            latencies.push(latency.as_secs_f64() * 1000.0);
        });
    }

    /// Record one executed hook callback.
    pub fn record_hook(&self, module: &str) {
        self.with_module(module, |m| {
            m.hooks_executed.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Record one brokered database query and its duration.
    pub fn record_db_query(&self, module: &str, duration: Duration) {
        self.with_module(module, |m| {
            m.db_query_count.fetch_add(1, Ordering::Relaxed);
            m.db_query_micros
                .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        });
    }

    /// Point-in-time snapshot for an extension. Unknown extensions report
    /// all-zero metrics.
    pub fn snapshot(&self, module: &str, memory_usage_mb: f64) -> MetricsSnapshot {
        self.with_module(module, |m| {
            let latencies = {
                let guard = m
                    .latencies_ms
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let mut sorted = guard.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                sorted
            };

            MetricsSnapshot {
                request_count: m.request_count.load(Ordering::Relaxed),
                error_count: m.error_count.load(Ordering::Relaxed),
                hooks_executed: m.hooks_executed.load(Ordering::Relaxed),
                memory_usage_mb,
                latency_p50_ms: percentile(&latencies, 0.50),
                latency_p95_ms: percentile(&latencies, 0.95),
                latency_p99_ms: percentile(&latencies, 0.99),
                db_query_count: m.db_query_count.load(Ordering::Relaxed),
                db_query_duration_ms: m.db_query_micros.load(Ordering::Relaxed) / 1000,
            }
        })
    }

    /// Drop all samples for an extension. Called on unregister.
    pub fn reset(&self, module: &str) {
        self.modules.remove(module);
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_requests_and_errors() {
        let collector = MetricsCollector::new();
        collector.record_request("m", Duration::from_millis(10), false);
        collector.record_request("m", Duration::from_millis(20), true);

        let snap = collector.snapshot("m", 0.0);
        assert_eq!(snap.request_count, 2);
        assert_eq!(snap.error_count, 1);
    }

    #[test]
    fn percentiles_over_recorded_latencies() {
        let collector = MetricsCollector::new();
        for ms in 1..=100u64 {
            collector.record_request("m", Duration::from_millis(ms), false);
        }

        let snap = collector.snapshot("m", 0.0);
        assert!((snap.latency_p50_ms - 50.0).abs() <= 2.0);
        assert!(snap.latency_p95_ms >= 94.0);
        assert!(snap.latency_p99_ms >= 98.0);
    }

    #[test]
    fn unknown_module_reports_zeroes() {
        let collector = MetricsCollector::new();
        let snap = collector.snapshot("never-seen", 0.0);
        assert_eq!(snap.request_count, 0);
        assert_eq!(snap.latency_p50_ms, 0.0);
    }

    #[test]
    fn db_query_durations_accumulate() {
        let collector = MetricsCollector::new();
        collector.record_db_query("m", Duration::from_millis(5));
        collector.record_db_query("m", Duration::from_millis(7));

        let snap = collector.snapshot("m", 0.0);
        assert_eq!(snap.db_query_count, 2);
        assert_eq!(snap.db_query_duration_ms, 12);
    }
}
