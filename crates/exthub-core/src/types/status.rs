//! Extension lifecycle state and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health::HealthStatus;

/// Lifecycle state of a registered extension.
///
/// Transitions: `Registered → Initializing → Running ⇄ Disabled`. Any
/// transition may land in `Failed` instead of its target; `Failed` is
/// terminal for automatic retries but an operator may still force `enable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    /// Registered but not yet initialized.
    Registered,
    /// Initialization entry point in progress.
    Initializing,
    /// Enabled and reachable through the dispatch tables.
    Running,
    /// Stopped by an operator; unreachable from any request path.
    Disabled,
    /// A lifecycle entry point failed; see `last_error`.
    Failed,
}

impl std::fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::Disabled => write!(f, "disabled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable status record owned by the registry, one per extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionStatus {
    /// Current lifecycle state.
    pub state: ExtensionState,
    /// When the extension was last enabled.
    pub enabled_at: Option<DateTime<Utc>>,
    /// Last lifecycle or migration error, if any.
    pub last_error: Option<String>,
    /// Whether the extension has completed initialization.
    pub initialized: bool,
    /// Last computed health snapshot (informational only; health is always
    /// recomputed on demand).
    pub health: Option<HealthStatus>,
}

impl ExtensionStatus {
    /// Status for a freshly registered extension.
    pub fn registered() -> Self {
        Self {
            state: ExtensionState::Registered,
            enabled_at: None,
            last_error: None,
            initialized: false,
            health: None,
        }
    }
}
