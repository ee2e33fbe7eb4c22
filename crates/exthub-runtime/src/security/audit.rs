//! Audit sinks — append-only storage for security decisions.

use std::collections::VecDeque;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::error;

use exthub_core::types::{AuditEntry, AuditResult};

/// Append-only destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Prepare backing storage. Called once at host startup, before any
    /// entry is recorded.
    async fn bootstrap(&self) -> exthub_core::AppResult<()> {
        Ok(())
    }

    /// Record an entry. Failures are logged, never propagated; an audit
    /// write must not fail the operation being audited.
    async fn record(&self, entry: AuditEntry);

    /// Most recent entries for an extension, newest first.
    async fn recent(&self, module: &str, limit: usize) -> Vec<AuditEntry>;
}

/// In-memory ring buffer sink, used by the test harness and when no
/// database is configured.
pub struct MemoryAuditSink {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl MemoryAuditSink {
    /// A sink retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// All retained entries, oldest first.
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }

    /// Count of retained denied entries for an extension.
    pub async fn denied_count(&self, module: &str) -> usize {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.module == module && e.result == AuditResult::Denied)
            .count()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    async fn recent(&self, module: &str, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .rev()
            .filter(|e| e.module == module)
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Sink persisting entries to the `ext_audit_log` table.
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    /// A sink writing through the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the audit table if it does not exist.
    pub async fn ensure_table(&self) -> exthub_core::AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ext_audit_log (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                module TEXT NOT NULL,
                actor TEXT,
                action TEXT NOT NULL,
                resource TEXT NOT NULL,
                result TEXT NOT NULL,
                metadata JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn bootstrap(&self) -> exthub_core::AppResult<()> {
        self.ensure_table().await
    }

    async fn record(&self, entry: AuditEntry) {
        let result = sqlx::query(
            r#"
            INSERT INTO ext_audit_log
                (id, created_at, module, actor, action, resource, result, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(&entry.module)
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.resource)
        .bind(entry.result.to_string())
        .bind(&entry.metadata)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            error!(module = %entry.module, error = %e, "Failed to persist audit entry");
        }
    }

    async fn recent(&self, module: &str, limit: usize) -> Vec<AuditEntry> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, created_at, module, actor, action, resource, result, metadata
            FROM ext_audit_log
            WHERE module = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(module)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows.into_iter().map(AuditRow::into_entry).collect(),
            Err(e) => {
                error!(module = %module, error = %e, "Failed to read audit entries");
                Vec::new()
            }
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: uuid::Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    module: String,
    actor: Option<String>,
    action: String,
    resource: String,
    result: String,
    metadata: Option<serde_json::Value>,
}

impl AuditRow {
    fn into_entry(self) -> AuditEntry {
        AuditEntry {
            id: self.id,
            timestamp: self.created_at,
            module: self.module,
            actor: self.actor,
            action: self.action,
            resource: self.resource,
            result: if self.result == "denied" {
                AuditResult::Denied
            } else {
                AuditResult::Allowed
            },
            metadata: self.metadata.unwrap_or(serde_json::Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_retains_and_filters() {
        let sink = MemoryAuditSink::new(8);
        sink.record(AuditEntry::new(
            "webhooks",
            None,
            "execute",
            "database",
            AuditResult::Denied,
        ))
        .await;
        sink.record(AuditEntry::new(
            "other",
            None,
            "read",
            "storage",
            AuditResult::Allowed,
        ))
        .await;

        let recent = sink.recent("webhooks", 10).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(sink.denied_count("webhooks").await, 1);
        assert_eq!(sink.denied_count("other").await, 0);
    }

    #[tokio::test]
    async fn memory_sink_evicts_oldest_at_capacity() {
        let sink = MemoryAuditSink::new(2);
        for action in ["a", "b", "c"] {
            sink.record(AuditEntry::new(
                "m",
                None,
                action,
                "database",
                AuditResult::Denied,
            ))
            .await;
        }
        let all = sink.all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, "b");
    }
}
