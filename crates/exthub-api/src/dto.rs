//! Response DTOs for the management API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exthub_core::types::{
    ExtensionMetadata, ExtensionState, ExtensionStatus, HealthStatus, MetricsSnapshot,
    MigrationRecord,
};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// One extension in a listing or detail response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionInfo {
    /// Extension name.
    pub name: String,
    /// Declared version.
    pub version: String,
    /// Description.
    pub description: String,
    /// Author.
    pub author: String,
    /// Lifecycle state.
    pub state: ExtensionState,
    /// When last enabled.
    pub enabled_at: Option<DateTime<Utc>>,
    /// Last lifecycle/migration error, if any.
    pub last_error: Option<String>,
}

impl ExtensionInfo {
    pub fn from_parts(meta: ExtensionMetadata, status: ExtensionStatus) -> Self {
        Self {
            name: meta.name,
            version: meta.version,
            description: meta.description,
            author: meta.author,
            state: status.state,
            enabled_at: status.enabled_at,
            last_error: status.last_error,
        }
    }
}

/// Host-level health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostHealthResponse {
    /// Overall host status; the host reports ok even when individual
    /// extensions are failed.
    pub status: String,
    /// Host version.
    pub version: String,
    /// Per-extension health.
    pub extensions: Vec<ExtensionHealthEntry>,
}

/// One extension's health inside the host health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionHealthEntry {
    /// Extension name.
    pub name: String,
    /// Health snapshot.
    pub health: HealthStatus,
}

/// Metrics response for one extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Extension name.
    pub name: String,
    /// Point-in-time metrics.
    pub metrics: MetricsSnapshot,
}

/// Migration ledger response for one extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsResponse {
    /// Extension name.
    pub name: String,
    /// Ledger entries, ascending by version.
    pub migrations: Vec<MigrationRecord>,
}

/// Request body for a rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackRequest {
    /// Version to roll back.
    pub version: i64,
}

/// Query parameters for the audit listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    /// Maximum entries to return.
    #[serde(default = "default_audit_limit")]
    pub limit: usize,
}

fn default_audit_limit() -> usize {
    50
}
