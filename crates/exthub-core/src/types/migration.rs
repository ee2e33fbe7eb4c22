//! Versioned, per-extension schema migrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application status of a migration version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Not yet applied.
    Pending,
    /// Applied successfully.
    Applied,
    /// Application failed; later versions are blocked.
    Failed,
    /// Applied previously, then rolled back.
    RolledBack,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Applied => write!(f, "applied"),
            Self::Failed => write!(f, "failed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// A versioned schema change owned by a single extension.
///
/// Versions apply strictly in ascending order within the extension's private
/// schema; the paired down script reverses the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Monotonic version number within the owning extension.
    pub version: i64,
    /// Human-readable description.
    pub description: String,
    /// SQL applied on upgrade.
    pub up_sql: String,
    /// SQL applied on rollback.
    pub down_sql: String,
}

/// Ledger row describing one (module, version) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Owning extension.
    pub module: String,
    /// Migration version.
    pub version: i64,
    /// Description captured when the migration first ran.
    pub description: String,
    /// Current status.
    pub status: MigrationStatus,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
    /// Error captured on failure, if any.
    pub error: Option<String>,
}
