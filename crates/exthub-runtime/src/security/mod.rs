//! Security and quota enforcement for extensions.

pub mod audit;
pub mod enforcer;
pub mod quota;

pub use audit::{AuditSink, MemoryAuditSink, PostgresAuditSink};
pub use enforcer::SecurityEnforcer;
pub use quota::{QuotaTracker, RequestGuard};
