//! Health probing with a hard deadline per probe.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use exthub_core::traits::Extension;
use exthub_core::types::{ExtensionState, HealthLevel, HealthStatus};

/// Probes extension health, bounding each probe with a timeout so a hung
/// extension cannot stall the management surface.
pub struct HealthChecker {
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Probe one extension given its lifecycle state.
    ///
    /// Non-running extensions report `Stopped` without being called; a probe
    /// that errors or exceeds the deadline reports `Unhealthy`.
    pub async fn probe(&self, ext: &Arc<dyn Extension>, state: ExtensionState) -> HealthStatus {
        if state != ExtensionState::Running {
            return HealthStatus::with_message(
                HealthLevel::Stopped,
                format!("extension is {state}"),
            );
        }

        match tokio::time::timeout(self.timeout, ext.health()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(extension = %ext.metadata().name, "Health probe timed out");
                HealthStatus::with_message(HealthLevel::Unhealthy, "health check timed out")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exthub_core::AppResult;
    use exthub_core::traits::ServiceScope;
    use exthub_core::types::ExtensionMetadata;

    struct SlowExtension;

    #[async_trait]
    impl Extension for SlowExtension {
        fn metadata(&self) -> ExtensionMetadata {
            ExtensionMetadata {
                name: "slow".to_string(),
                version: "1.0.0".to_string(),
                author: "test".to_string(),
                ..Default::default()
            }
        }

        async fn initialize(&self, _services: ServiceScope) -> AppResult<()> {
            Ok(())
        }

        async fn health(&self) -> HealthStatus {
            tokio::time::sleep(Duration::from_secs(30)).await;
            HealthStatus::healthy()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probe_times_out_hung_extension() {
        let checker = HealthChecker::new(Duration::from_secs(5));
        let ext: Arc<dyn Extension> = Arc::new(SlowExtension);

        let status = checker.probe(&ext, ExtensionState::Running).await;
        assert_eq!(status.status, HealthLevel::Unhealthy);
        assert!(status.message.contains("timed out"));
    }

    #[tokio::test]
    async fn stopped_extension_is_not_probed() {
        let checker = HealthChecker::new(Duration::from_secs(5));
        let ext: Arc<dyn Extension> = Arc::new(SlowExtension);

        let status = checker.probe(&ext, ExtensionState::Disabled).await;
        assert_eq!(status.status, HealthLevel::Stopped);
    }
}
