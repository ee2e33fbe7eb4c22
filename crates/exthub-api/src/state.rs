//! Application state shared across all handlers.

use std::sync::Arc;

use exthub_core::config::AppConfig;
use exthub_runtime::ExtensionRegistry;

/// Application state passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The extension registry.
    pub registry: Arc<ExtensionRegistry>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, registry: Arc<ExtensionRegistry>) -> Self {
        Self { config, registry }
    }
}
