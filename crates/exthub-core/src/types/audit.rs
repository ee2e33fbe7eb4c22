//! Append-only audit records for security-relevant decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of an audited decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// The operation was permitted.
    Allowed,
    /// The operation was rejected.
    Denied,
}

impl std::fmt::Display for AuditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// An immutable record of a security-relevant decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// The extension the decision concerns.
    pub module: String,
    /// The acting user, if any.
    pub actor: Option<String>,
    /// The attempted action, e.g. `"execute"`.
    pub action: String,
    /// The resource the action targeted, e.g. `"database"`.
    pub resource: String,
    /// Allow or deny.
    pub result: AuditResult,
    /// Additional context.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    /// Build a new entry stamped with the current time.
    pub fn new(
        module: impl Into<String>,
        actor: Option<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        result: AuditResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            module: module.into(),
            actor,
            action: action.into(),
            resource: resource.into(),
            result,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach metadata to the entry.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
