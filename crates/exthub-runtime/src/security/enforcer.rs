//! Capability and quota enforcement — the gate in front of every broker
//! operation and mounted route.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::warn;

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::types::{AuditEntry, AuditResult, AuthContext, Permission, Quota};

use super::audit::AuditSink;
use super::quota::{QuotaTracker, RequestGuard};

/// Checks extension capabilities and quotas, emitting an audit entry for
/// every denial.
pub struct SecurityEnforcer {
    permissions: DashMap<String, Vec<Permission>>,
    roles: RwLock<HashSet<String>>,
    quotas: QuotaTracker,
    audit: Arc<dyn AuditSink>,
}

impl SecurityEnforcer {
    /// An enforcer with the host's base role set.
    pub fn new(default_quota: Quota, audit: Arc<dyn AuditSink>) -> Self {
        let mut roles = HashSet::new();
        roles.insert("admin".to_string());
        roles.insert("user".to_string());

        Self {
            permissions: DashMap::new(),
            roles: RwLock::new(roles),
            quotas: QuotaTracker::new(default_quota),
            audit,
        }
    }

    /// Grant an extension its statically declared permissions and quota.
    /// Called once at registration.
    pub async fn register_extension(
        &self,
        module: &str,
        permissions: Vec<Permission>,
        quota: Option<Quota>,
        declared_roles: Vec<String>,
    ) {
        self.permissions.insert(module.to_string(), permissions);
        self.quotas.configure(module, quota);

        if !declared_roles.is_empty() {
            let mut roles = self.roles.write().await;
            for role in declared_roles {
                roles.insert(role);
            }
        }
    }

    /// Whether a role name is known to the host (including
    /// extension-declared roles).
    pub async fn role_known(&self, role: &str) -> bool {
        self.roles.read().await.contains(role)
    }

    /// Verify the extension holds a permission covering `resource`/`action`.
    ///
    /// A denial writes one audit entry with `result=denied` and returns
    /// `PermissionDenied`.
    pub async fn check(
        &self,
        module: &str,
        resource: &str,
        action: &str,
        actor: Option<&AuthContext>,
    ) -> AppResult<()> {
        let allowed = self
            .permissions
            .get(module)
            .map(|perms| perms.iter().any(|p| p.allows(resource, action)))
            .unwrap_or(false);

        if allowed {
            return Ok(());
        }

        warn!(
            extension = %module,
            resource = %resource,
            action = %action,
            "Capability check denied"
        );
        self.audit
            .record(AuditEntry::new(
                module,
                actor.map(|a| a.username.clone()),
                action,
                resource,
                AuditResult::Denied,
            ))
            .await;

        Err(AppError::permission_denied(format!(
            "extension '{module}' lacks permission for {action} on {resource}"
        )))
    }

    /// Admit one request against the extension's quota; a rejection writes
    /// one audit entry and returns `QuotaExceeded`.
    pub async fn admit_request(
        &self,
        module: &str,
        actor: Option<&AuthContext>,
    ) -> AppResult<RequestGuard> {
        match self.quotas.admit_request(module) {
            Ok(guard) => Ok(guard),
            Err(err) => {
                self.audit
                    .record(
                        AuditEntry::new(
                            module,
                            actor.map(|a| a.username.clone()),
                            "request",
                            "http",
                            AuditResult::Denied,
                        )
                        .with_metadata(serde_json::json!({ "reason": err.message })),
                    )
                    .await;
                Err(err)
            }
        }
    }

    /// Reserve storage bytes; a rejection writes one audit entry.
    pub async fn reserve_disk(&self, module: &str, bytes: u64) -> AppResult<()> {
        match self.quotas.reserve_disk(module, bytes) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.audit
                    .record(
                        AuditEntry::new(module, None, "write", "storage", AuditResult::Denied)
                            .with_metadata(serde_json::json!({ "reason": err.message })),
                    )
                    .await;
                Err(err)
            }
        }
    }

    /// Release previously reserved storage bytes.
    pub fn release_disk(&self, module: &str, bytes: u64) {
        self.quotas.release_disk(module, bytes);
    }

    /// The configured quota for an extension.
    pub fn quota_for(&self, module: &str) -> Quota {
        self.quotas.quota_for(module)
    }

    /// Approximate memory usage attributed to an extension, in MB.
    pub fn memory_estimate_mb(&self, module: &str) -> f64 {
        self.quotas.memory_estimate_mb(module)
    }

    /// The audit sink, for read access from the management surface.
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Declared permissions for an extension.
    pub fn permissions_for(&self, module: &str) -> Vec<Permission> {
        self.permissions
            .get(module)
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::audit::MemoryAuditSink;

    fn permission(resource: &str, actions: &[&str]) -> Permission {
        Permission {
            name: format!("test.{resource}"),
            description: String::new(),
            resource: resource.to_string(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn check_allows_declared_capability() {
        let audit = Arc::new(MemoryAuditSink::default());
        let enforcer = SecurityEnforcer::new(Quota::default(), audit.clone());
        enforcer
            .register_extension("webhooks", vec![permission("database", &["execute"])], None, vec![])
            .await;

        assert!(
            enforcer
                .check("webhooks", "database", "execute", None)
                .await
                .is_ok()
        );
        assert_eq!(audit.denied_count("webhooks").await, 0);
    }

    #[tokio::test]
    async fn denial_writes_exactly_one_audit_entry() {
        let audit = Arc::new(MemoryAuditSink::default());
        let enforcer = SecurityEnforcer::new(Quota::default(), audit.clone());
        enforcer
            .register_extension("webhooks", vec![], None, vec![])
            .await;

        let err = enforcer
            .check("webhooks", "database", "execute", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::PermissionDenied);
        assert_eq!(audit.denied_count("webhooks").await, 1);
    }

    #[tokio::test]
    async fn declared_roles_merge_into_host_set() {
        let audit = Arc::new(MemoryAuditSink::default());
        let enforcer = SecurityEnforcer::new(Quota::default(), audit);
        enforcer
            .register_extension("webhooks", vec![], None, vec!["webhook-admin".to_string()])
            .await;

        assert!(enforcer.role_known("admin").await);
        assert!(enforcer.role_known("webhook-admin").await);
        assert!(!enforcer.role_known("unknown").await);
    }

    #[tokio::test]
    async fn quota_rejection_audits_once() {
        let audit = Arc::new(MemoryAuditSink::default());
        let quota = Quota {
            max_requests_per_second: 1,
            ..Quota::default()
        };
        let enforcer = SecurityEnforcer::new(Quota::default(), audit.clone());
        enforcer
            .register_extension("webhooks", vec![], Some(quota), vec![])
            .await;

        let _first = enforcer.admit_request("webhooks", None).await.unwrap();
        let err = enforcer.admit_request("webhooks", None).await.unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::QuotaExceeded);
        assert_eq!(audit.denied_count("webhooks").await, 1);
    }
}
