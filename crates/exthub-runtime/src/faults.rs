//! Rolling-window fault accounting per extension.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Counts faults per extension over a rolling window and reports when an
/// extension crosses the disable threshold.
pub struct FaultTracker {
    threshold: u32,
    window: Duration,
    faults: DashMap<String, VecDeque<Instant>>,
}

impl FaultTracker {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            threshold,
            window,
            faults: DashMap::new(),
        }
    }

    /// Record one fault. Returns `true` when the extension has now exceeded
    /// the threshold within the window and should be disabled.
    pub fn record(&self, module: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.faults.entry(module.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        entry.push_back(now);
        entry.len() as u32 >= self.threshold
    }

    /// Current fault count inside the window.
    pub fn count(&self, module: &str) -> u32 {
        let now = Instant::now();
        self.faults
            .get(module)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|t| now.duration_since(**t) <= self.window)
                    .count() as u32
            })
            .unwrap_or(0)
    }

    /// Forget all faults for an extension. Called when it is re-enabled.
    pub fn clear(&self, module: &str) {
        self.faults.remove(module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_trips_within_window() {
        let tracker = FaultTracker::new(3, Duration::from_secs(60));
        assert!(!tracker.record("m"));
        assert!(!tracker.record("m"));
        assert!(tracker.record("m"));
        assert_eq!(tracker.count("m"), 3);
    }

    #[test]
    fn clear_resets_the_count() {
        let tracker = FaultTracker::new(2, Duration::from_secs(60));
        tracker.record("m");
        tracker.clear("m");
        assert_eq!(tracker.count("m"), 0);
        assert!(!tracker.record("m"));
    }

    #[test]
    fn modules_are_tracked_independently() {
        let tracker = FaultTracker::new(2, Duration::from_secs(60));
        tracker.record("a");
        assert!(!tracker.record("b"));
        assert!(tracker.record("a"));
    }
}
