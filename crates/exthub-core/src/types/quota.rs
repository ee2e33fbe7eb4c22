//! Per-extension hard resource ceilings.

use serde::{Deserialize, Serialize};

/// Hard per-extension resource and rate ceilings, enforced at call time.
///
/// Exceeding any ceiling rejects the call immediately; there is no
/// backpressure queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum approximate memory in MB.
    #[serde(default = "default_memory")]
    pub max_memory_mb: u64,
    /// Maximum in-flight requests.
    #[serde(default = "default_concurrent")]
    pub max_concurrent_requests: u32,
    /// Maximum requests within any one-second window.
    #[serde(default = "default_rps")]
    pub max_requests_per_second: u32,
    /// Maximum storage footprint in MB.
    #[serde(default = "default_disk")]
    pub max_disk_mb: u64,
}

impl Default for Quota {
    fn default() -> Self {
        Self {
            max_memory_mb: default_memory(),
            max_concurrent_requests: default_concurrent(),
            max_requests_per_second: default_rps(),
            max_disk_mb: default_disk(),
        }
    }
}

fn default_memory() -> u64 {
    256
}

fn default_concurrent() -> u32 {
    64
}

fn default_rps() -> u32 {
    100
}

fn default_disk() -> u64 {
    1024
}
