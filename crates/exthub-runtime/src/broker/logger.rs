//! Logger pre-tagged with the owning extension's name.

use tracing::{debug, error, info, warn};

use exthub_core::traits::ScopedLogger;

/// [`ScopedLogger`] emitting through the host's tracing subscriber with an
/// `extension` field on every event.
pub struct TracingScopedLogger {
    module: String,
}

impl TracingScopedLogger {
    pub fn new(module: String) -> Self {
        Self { module }
    }
}

impl ScopedLogger for TracingScopedLogger {
    fn debug(&self, message: &str) {
        debug!(extension = %self.module, "{message}");
    }

    fn info(&self, message: &str) {
        info!(extension = %self.module, "{message}");
    }

    fn warn(&self, message: &str) {
        warn!(extension = %self.module, "{message}");
    }

    fn error(&self, message: &str) {
        error!(extension = %self.module, "{message}");
    }
}
