//! Per-extension quota tracking.
//!
//! Limits are hard: exceeding one rejects the call immediately rather than
//! queueing it. Counters use atomics so checks stay cheap on the request
//! path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::types::Quota;

struct ModuleQuota {
    quota: Quota,
    concurrent: AtomicU32,
    window_count: AtomicU32,
    window_start: std::sync::Mutex<Instant>,
    disk_used_bytes: AtomicU64,
}

impl ModuleQuota {
    fn new(quota: Quota) -> Self {
        Self {
            quota,
            concurrent: AtomicU32::new(0),
            window_count: AtomicU32::new(0),
            window_start: std::sync::Mutex::new(Instant::now()),
            disk_used_bytes: AtomicU64::new(0),
        }
    }
}

/// Tracks live usage per extension and compares it against configured
/// ceilings at call time.
pub struct QuotaTracker {
    modules: DashMap<String, Arc<ModuleQuota>>,
    default_quota: Quota,
}

impl QuotaTracker {
    /// A tracker using `default_quota` for extensions without their own.
    pub fn new(default_quota: Quota) -> Self {
        Self {
            modules: DashMap::new(),
            default_quota,
        }
    }

    /// Configure the quota for an extension.
    pub fn configure(&self, module: &str, quota: Option<Quota>) {
        let quota = quota.unwrap_or_else(|| self.default_quota.clone());
        self.modules
            .insert(module.to_string(), Arc::new(ModuleQuota::new(quota)));
    }

    fn state(&self, module: &str) -> Arc<ModuleQuota> {
        self.modules
            .entry(module.to_string())
            .or_insert_with(|| Arc::new(ModuleQuota::new(self.default_quota.clone())))
            .clone()
    }

    /// Admit one request, returning a guard that releases the concurrency
    /// slot when dropped. Rejects when the per-second or concurrency ceiling
    /// is hit.
    pub fn admit_request(&self, module: &str) -> AppResult<RequestGuard> {
        let state = self.state(module);

        // Fixed one-second window for the rate ceiling.
        {
            let mut start = state
                .window_start
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if start.elapsed().as_secs() >= 1 {
                *start = Instant::now();
                state.window_count.store(0, Ordering::Relaxed);
            }
            let in_window = state.window_count.fetch_add(1, Ordering::Relaxed) + 1;
            if in_window > state.quota.max_requests_per_second {
                return Err(AppError::quota_exceeded(format!(
                    "extension '{module}' exceeded {} requests per second",
                    state.quota.max_requests_per_second
                )));
            }
        }

        let in_flight = state.concurrent.fetch_add(1, Ordering::AcqRel) + 1;
        if in_flight > state.quota.max_concurrent_requests {
            state.concurrent.fetch_sub(1, Ordering::AcqRel);
            return Err(AppError::quota_exceeded(format!(
                "extension '{module}' exceeded {} concurrent requests",
                state.quota.max_concurrent_requests
            )));
        }

        Ok(RequestGuard { state })
    }

    /// Reserve storage bytes against the disk ceiling.
    pub fn reserve_disk(&self, module: &str, bytes: u64) -> AppResult<()> {
        let state = self.state(module);
        let used = state.disk_used_bytes.fetch_add(bytes, Ordering::AcqRel) + bytes;
        if used > state.quota.max_disk_mb * 1024 * 1024 {
            state.disk_used_bytes.fetch_sub(bytes, Ordering::AcqRel);
            return Err(AppError::quota_exceeded(format!(
                "extension '{module}' exceeded {} MB of storage",
                state.quota.max_disk_mb
            )));
        }
        Ok(())
    }

    /// Release previously reserved storage bytes.
    pub fn release_disk(&self, module: &str, bytes: u64) {
        let state = self.state(module);
        let mut current = state.disk_used_bytes.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(bytes);
            match state.disk_used_bytes.compare_exchange(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// The configured quota for an extension.
    pub fn quota_for(&self, module: &str) -> Quota {
        self.state(module).quota.clone()
    }

    /// Approximate memory attributed to an extension, derived from its
    /// tracked usage, in MB.
    pub fn memory_estimate_mb(&self, module: &str) -> f64 {
        let state = self.state(module);
        state.disk_used_bytes.load(Ordering::Relaxed) as f64 / (1024.0 * 1024.0)
    }
}

/// Releases a concurrency slot on drop.
pub struct RequestGuard {
    state: Arc<ModuleQuota>,
}

impl std::fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGuard")
            .field(
                "concurrent",
                &self.state.concurrent.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.state.concurrent.fetch_sub(1, Ordering::AcqRel);
    }
}
