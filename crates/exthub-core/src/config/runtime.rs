//! Extension runtime configuration.

use serde::{Deserialize, Serialize};

use crate::types::quota::Quota;

/// Extension runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Whether registered extensions are enabled automatically at startup.
    #[serde(default = "default_true")]
    pub auto_enable: bool,
    /// Number of handler faults within the rolling window that triggers an
    /// automatic disable of the offending extension.
    #[serde(default = "default_fault_threshold")]
    pub fault_threshold: u32,
    /// Rolling window for fault counting, in seconds.
    #[serde(default = "default_fault_window")]
    pub fault_window_seconds: u64,
    /// Timeout applied to extension health probes, in seconds.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,
    /// Directory holding per-extension configuration files (`<name>.json`).
    #[serde(default = "default_config_dir")]
    pub config_dir: String,
    /// Root directory for extension-scoped storage.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    /// Debounce for the configuration watcher, in milliseconds.
    #[serde(default = "default_watch_debounce")]
    pub watch_debounce_ms: u64,
    /// Quota applied to extensions that do not declare their own.
    #[serde(default)]
    pub default_quota: Quota,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            auto_enable: true,
            fault_threshold: default_fault_threshold(),
            fault_window_seconds: default_fault_window(),
            health_timeout_seconds: default_health_timeout(),
            config_dir: default_config_dir(),
            storage_root: default_storage_root(),
            watch_debounce_ms: default_watch_debounce(),
            default_quota: Quota::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fault_threshold() -> u32 {
    5
}

fn default_fault_window() -> u64 {
    60
}

fn default_health_timeout() -> u64 {
    5
}

fn default_config_dir() -> String {
    "config/extensions".to_string()
}

fn default_storage_root() -> String {
    "data/extensions".to_string()
}

fn default_watch_debounce() -> u64 {
    500
}
