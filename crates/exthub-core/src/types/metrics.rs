//! Point-in-time metrics snapshot for one extension.

use serde::{Deserialize, Serialize};

/// Monotonic counters and derived latency percentiles for one extension.
///
/// Snapshots are not atomic across fields; each field is individually
/// consistent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total requests dispatched to the extension's routes.
    pub request_count: u64,
    /// Total errors (handler errors, faults, and rejections).
    pub error_count: u64,
    /// Total hook callbacks executed on behalf of this extension.
    pub hooks_executed: u64,
    /// Approximate resident memory attributed to the extension, in MB.
    pub memory_usage_mb: f64,
    /// Median request latency in milliseconds.
    pub latency_p50_ms: f64,
    /// 95th percentile request latency in milliseconds.
    pub latency_p95_ms: f64,
    /// 99th percentile request latency in milliseconds.
    pub latency_p99_ms: f64,
    /// Total database queries issued through the broker.
    pub db_query_count: u64,
    /// Cumulative database query duration in milliseconds.
    pub db_query_duration_ms: u64,
}
