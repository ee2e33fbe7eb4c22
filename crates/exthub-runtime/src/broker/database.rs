//! Schema-scoped database access.
//!
//! Every statement runs inside its own transaction with `search_path`
//! pinned to the extension's private schema, so unqualified table names can
//! only resolve there. Rows come back as JSON objects via a `row_to_json`
//! wrapper, which keeps the surface free of sqlx row types.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres};

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::hooks::{HookContext, HookType};
use exthub_core::traits::ScopedDatabase;

use crate::dispatch::SharedDispatch;
use crate::hooks::HookPipeline;
use crate::metrics::MetricsCollector;
use crate::security::SecurityEnforcer;

/// Bind JSON parameter values positionally onto a sqlx query.
macro_rules! bind_json_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for value in $params.iter() {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Bool(b) => query.bind(*b),
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        query.bind(i)
                    } else {
                        query.bind(n.as_f64().unwrap_or(0.0))
                    }
                }
                Value::String(s) => query.bind(s.as_str()),
                other => query.bind(sqlx::types::Json(other.clone())),
            };
        }
        query
    }};
}

/// Production [`ScopedDatabase`] backed by the host pool.
pub struct PostgresScopedDatabase {
    pool: PgPool,
    module: String,
    schema: String,
    enforcer: Arc<SecurityEnforcer>,
    metrics: Arc<MetricsCollector>,
    dispatch: Arc<SharedDispatch>,
    pipeline: Arc<HookPipeline>,
}

impl PostgresScopedDatabase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        module: String,
        schema: String,
        enforcer: Arc<SecurityEnforcer>,
        metrics: Arc<MetricsCollector>,
        dispatch: Arc<SharedDispatch>,
        pipeline: Arc<HookPipeline>,
    ) -> Self {
        Self {
            pool,
            module,
            schema,
            enforcer,
            metrics,
            dispatch,
            pipeline,
        }
    }

    async fn fire_hook(&self, hook: HookType, sql: &str) {
        let table = self.dispatch.current().await;
        if table.hooks_for(hook).is_empty() {
            return;
        }
        let mut ctx = HookContext::new(hook)
            .with_data("extension", Value::String(self.module.clone()))
            .with_data("sql", Value::String(sql.to_string()));
        self.pipeline.dispatch(&table, hook, &mut ctx).await;
    }

    /// Open a transaction pinned to the extension's schema.
    async fn scoped_tx(&self) -> AppResult<sqlx::Transaction<'_, Postgres>> {
        let mut tx = self.pool.begin().await?;
        // Identifier comes from validated metadata, but quote it anyway.
        sqlx::query(&format!(
            r#"SET LOCAL search_path TO "{}""#,
            self.schema.replace('"', "")
        ))
        .execute(&mut *tx)
        .await?;
        Ok(tx)
    }
}

#[async_trait]
impl ScopedDatabase for PostgresScopedDatabase {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> AppResult<u64> {
        self.enforcer
            .check(&self.module, "database", "execute", None)
            .await?;
        self.fire_hook(HookType::PreDatabase, sql).await;

        let started = Instant::now();
        let mut tx = self.scoped_tx().await?;
        let query = bind_json_params!(sqlx::query(sql), params);
        let result = query.execute(&mut *tx).await;
        let outcome = match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            // Rollback happens on transaction drop.
            Err(err) => Err(AppError::from(err)),
        };
        self.metrics.record_db_query(&self.module, started.elapsed());

        self.fire_hook(HookType::PostDatabase, sql).await;
        outcome
    }

    async fn fetch_all(&self, sql: &str, params: Vec<Value>) -> AppResult<Vec<Value>> {
        self.enforcer
            .check(&self.module, "database", "read", None)
            .await?;
        self.fire_hook(HookType::PreDatabase, sql).await;

        let wrapped = json_wrap(sql);
        let started = Instant::now();
        let mut tx = self.scoped_tx().await?;
        let query = bind_json_params!(sqlx::query_scalar::<_, Value>(&wrapped), params);
        let result = query.fetch_one(&mut *tx).await;
        let outcome = match result {
            Ok(Value::Array(items)) => {
                tx.commit().await?;
                Ok(items)
            }
            Ok(other) => Err(AppError::database(format!(
                "unexpected row aggregation result: {other}"
            ))),
            Err(err) => Err(AppError::from(err)),
        };
        self.metrics.record_db_query(&self.module, started.elapsed());

        self.fire_hook(HookType::PostDatabase, sql).await;
        outcome
    }

    async fn fetch_optional(&self, sql: &str, params: Vec<Value>) -> AppResult<Option<Value>> {
        let mut rows = self.fetch_all(sql, params).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    fn schema(&self) -> &str {
        &self.schema
    }
}

/// Wrap an arbitrary SELECT so the server marshals rows to a JSON array.
fn json_wrap(sql: &str) -> String {
    format!(
        "SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) FROM ({}) t",
        sql.trim().trim_end_matches(';')
    )
}

/// Stand-in used when the host runs without a database. Every call fails
/// with `ServiceUnavailable`.
pub struct NullScopedDatabase {
    schema: String,
}

impl NullScopedDatabase {
    pub fn new(schema: String) -> Self {
        Self { schema }
    }

    fn unavailable(&self) -> AppError {
        AppError::service_unavailable("no database is configured for this host")
    }
}

#[async_trait]
impl ScopedDatabase for NullScopedDatabase {
    async fn execute(&self, _sql: &str, _params: Vec<Value>) -> AppResult<u64> {
        Err(self.unavailable())
    }

    async fn fetch_all(&self, _sql: &str, _params: Vec<Value>) -> AppResult<Vec<Value>> {
        Err(self.unavailable())
    }

    async fn fetch_optional(&self, _sql: &str, _params: Vec<Value>) -> AppResult<Option<Value>> {
        Err(self.unavailable())
    }

    fn schema(&self) -> &str {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_wrap_strips_trailing_semicolon() {
        assert_eq!(
            json_wrap("SELECT * FROM endpoints;"),
            "SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) FROM (SELECT * FROM endpoints) t"
        );
    }

    #[tokio::test]
    async fn null_database_reports_unavailable() {
        let db = NullScopedDatabase::new("ext_webhooks".to_string());
        let err = db.execute("SELECT 1", vec![]).await.unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::ServiceUnavailable);
        assert_eq!(db.schema(), "ext_webhooks");
    }
}
