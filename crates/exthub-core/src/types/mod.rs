//! Shared domain types for the extension runtime.

pub mod audit;
pub mod health;
pub mod metadata;
pub mod metrics;
pub mod migration;
pub mod permission;
pub mod quota;
pub mod request;
pub mod schema;
pub mod status;

pub use audit::{AuditEntry, AuditResult};
pub use health::{HealthCheck, HealthLevel, HealthStatus};
pub use metadata::ExtensionMetadata;
pub use metrics::MetricsSnapshot;
pub use migration::{Migration, MigrationRecord, MigrationStatus};
pub use permission::Permission;
pub use quota::Quota;
pub use request::{AuthContext, AuthRequirement, ExtensionRequest, ExtensionResponse};
pub use schema::{ConfigField, ConfigFieldKind, ConfigSchema};
pub use status::{ExtensionState, ExtensionStatus};
