//! Migration execution against per-extension schemas.
//!
//! Each migration runs in its own transaction with `search_path` pinned to
//! the extension's schema. The ledger lives in the `public` schema and is
//! always referenced fully qualified, so migration SQL cannot shadow it.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::types::{Migration, MigrationRecord, MigrationStatus};

/// Applies and rolls back extension migrations, recording every outcome in
/// the `ext_migrations` ledger.
pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger table if it does not exist.
    pub async fn ensure_ledger(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS public.ext_migrations (
                module TEXT NOT NULL,
                version BIGINT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                error TEXT,
                PRIMARY KEY (module, version)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Ledger status for every declared migration of a module, including
    /// versions the ledger has never seen (reported as pending).
    pub async fn status(
        &self,
        module: &str,
        migrations: &[Migration],
    ) -> AppResult<Vec<MigrationRecord>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT module, version, description, status, updated_at, error
            FROM public.ext_migrations
            WHERE module = $1
            ORDER BY version
            "#,
        )
        .bind(module)
        .fetch_all(&self.pool)
        .await?;

        let mut records: Vec<MigrationRecord> = Vec::with_capacity(migrations.len());
        let mut ordered = migrations.to_vec();
        ordered.sort_by_key(|m| m.version);

        for migration in &ordered {
            match rows.iter().find(|r| r.version == migration.version) {
                Some(row) => records.push(row.clone().into_record()),
                None => records.push(MigrationRecord {
                    module: module.to_string(),
                    version: migration.version,
                    description: migration.description.clone(),
                    status: MigrationStatus::Pending,
                    updated_at: Utc::now(),
                    error: None,
                }),
            }
        }
        Ok(records)
    }

    /// Versions of a module currently recorded as applied.
    pub async fn applied_versions(&self, module: &str) -> AppResult<Vec<i64>> {
        let versions = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT version FROM public.ext_migrations
            WHERE module = $1 AND status = 'applied'
            ORDER BY version
            "#,
        )
        .bind(module)
        .fetch_all(&self.pool)
        .await?;
        Ok(versions)
    }

    /// Apply all pending migrations for a module, in ascending version
    /// order, stopping at the first failure.
    ///
    /// Already-applied versions are skipped, so a partially migrated module
    /// resumes where it stopped. Returns the number of versions applied.
    pub async fn run(
        &self,
        module: &str,
        schema: &str,
        migrations: &[Migration],
    ) -> AppResult<u32> {
        self.ensure_ledger().await?;
        sqlx::query(&format!(
            r#"CREATE SCHEMA IF NOT EXISTS "{}""#,
            schema.replace('"', "")
        ))
        .execute(&self.pool)
        .await?;

        let applied = self.applied_versions(module).await?;
        let mut ordered = migrations.to_vec();
        ordered.sort_by_key(|m| m.version);

        let mut count = 0u32;
        for migration in &ordered {
            if applied.contains(&migration.version) {
                continue;
            }

            info!(
                extension = %module,
                version = migration.version,
                description = %migration.description,
                "Applying migration"
            );
            match self.apply_sql(schema, &migration.up_sql).await {
                Ok(()) => {
                    self.record(module, migration, MigrationStatus::Applied, None)
                        .await?;
                    count += 1;
                }
                Err(err) => {
                    error!(
                        extension = %module,
                        version = migration.version,
                        error = %err,
                        "Migration failed"
                    );
                    self.record(module, migration, MigrationStatus::Failed, Some(&err.message))
                        .await?;
                    return Err(AppError::migration(format!(
                        "migration {} for extension '{module}' failed: {}",
                        migration.version, err.message
                    )));
                }
            }
        }
        Ok(count)
    }

    /// Roll back one applied version using its down script.
    ///
    /// Refuses with a dependency-order error while any later version is
    /// still applied; later schema changes may build on this one.
    pub async fn rollback(
        &self,
        module: &str,
        schema: &str,
        migrations: &[Migration],
        version: i64,
    ) -> AppResult<()> {
        self.ensure_ledger().await?;

        let applied = self.applied_versions(module).await?;
        if !applied.contains(&version) {
            return Err(AppError::not_found(format!(
                "migration {version} for extension '{module}' is not applied"
            )));
        }
        if let Some(later) = blocking_later_version(&applied, version) {
            return Err(AppError::dependency_order(format!(
                "cannot roll back migration {version} for extension '{module}': \
                 version {later} is still applied"
            )));
        }

        let migration = migrations
            .iter()
            .find(|m| m.version == version)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "extension '{module}' declares no migration with version {version}"
                ))
            })?;

        info!(extension = %module, version, "Rolling back migration");
        self.apply_sql(schema, &migration.down_sql).await?;
        self.record(module, migration, MigrationStatus::RolledBack, None)
            .await?;
        Ok(())
    }

    async fn apply_sql(&self, schema: &str, sql: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            r#"SET LOCAL search_path TO "{}""#,
            schema.replace('"', "")
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(sql).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record(
        &self,
        module: &str,
        migration: &Migration,
        status: MigrationStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO public.ext_migrations
                (module, version, description, status, updated_at, error)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (module, version)
            DO UPDATE SET status = $4, updated_at = $5, error = $6
            "#,
        )
        .bind(module)
        .bind(migration.version)
        .bind(&migration.description)
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// The lowest applied version later than `version`, if any.
fn blocking_later_version(applied: &[i64], version: i64) -> Option<i64> {
    applied.iter().copied().filter(|v| *v > version).min()
}

#[derive(Clone, sqlx::FromRow)]
struct LedgerRow {
    module: String,
    version: i64,
    description: String,
    status: String,
    updated_at: chrono::DateTime<Utc>,
    error: Option<String>,
}

impl LedgerRow {
    fn into_record(self) -> MigrationRecord {
        let status = match self.status.as_str() {
            "applied" => MigrationStatus::Applied,
            "failed" => MigrationStatus::Failed,
            "rolled_back" => MigrationStatus::RolledBack,
            _ => MigrationStatus::Pending,
        };
        MigrationRecord {
            module: self.module,
            version: self.version,
            description: self.description,
            status,
            updated_at: self.updated_at,
            error: self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_applied_version_blocks_rollback() {
        assert_eq!(blocking_later_version(&[1, 2, 3], 2), Some(3));
        assert_eq!(blocking_later_version(&[1, 2, 3], 3), None);
        assert_eq!(blocking_later_version(&[], 1), None);
    }
}
