//! The extension registry — owner of the lifecycle state machine and the
//! single writer of the dispatch tables.
//!
//! Lifecycle transitions are serialized through one mutex, but extension
//! entry points (initialize/start/stop) always run outside any registry
//! lock; status transitions are committed under the status lock before and
//! after. Readers of the dispatch table never block on writers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::config::RuntimeConfig;
use exthub_core::traits::Extension;
use exthub_core::types::{
    AuditEntry, ConfigSchema, ExtensionMetadata, ExtensionState, ExtensionStatus, HealthLevel,
    HealthStatus, MetricsSnapshot, MigrationRecord,
};

use crate::broker::ServiceBroker;
use crate::dispatch::{DispatchTable, SharedDispatch};
use crate::faults::FaultTracker;
use crate::hooks::HookPipeline;
use crate::metrics::{HealthChecker, MetricsCollector};
use crate::migrate::MigrationRunner;
use crate::security::{AuditSink, MemoryAuditSink, PostgresAuditSink, SecurityEnforcer};

/// Top-level orchestrator for all extensions.
pub struct ExtensionRegistry {
    extensions: RwLock<HashMap<String, Arc<dyn Extension>>>,
    statuses: RwLock<HashMap<String, ExtensionStatus>>,
    orders: RwLock<HashMap<String, u64>>,
    enable_seq: AtomicU64,
    lifecycle: Mutex<()>,
    dispatch: Arc<SharedDispatch>,
    pipeline: Arc<HookPipeline>,
    metrics: Arc<MetricsCollector>,
    enforcer: Arc<SecurityEnforcer>,
    faults: FaultTracker,
    health: HealthChecker,
    broker: ServiceBroker,
    migrations: Option<MigrationRunner>,
    audit: Arc<dyn AuditSink>,
    config: RuntimeConfig,
}

impl ExtensionRegistry {
    /// Build a registry. `pool` is `None` when the host runs without a
    /// database; brokered database access and migrations are then
    /// unavailable and audit entries stay in memory.
    pub fn new(config: RuntimeConfig, pool: Option<PgPool>) -> Self {
        let audit: Arc<dyn AuditSink> = match &pool {
            Some(pool) => Arc::new(PostgresAuditSink::new(pool.clone())),
            None => Arc::new(MemoryAuditSink::default()),
        };
        let dispatch = Arc::new(SharedDispatch::new());
        let metrics = Arc::new(MetricsCollector::new());
        let pipeline = Arc::new(HookPipeline::new(metrics.clone()));
        let enforcer = Arc::new(SecurityEnforcer::new(
            config.default_quota.clone(),
            audit.clone(),
        ));
        let broker = ServiceBroker::new(
            pool.clone(),
            PathBuf::from(&config.storage_root),
            enforcer.clone(),
            metrics.clone(),
            dispatch.clone(),
            pipeline.clone(),
        );

        Self {
            extensions: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
            enable_seq: AtomicU64::new(1),
            lifecycle: Mutex::new(()),
            dispatch,
            pipeline,
            metrics: metrics.clone(),
            enforcer,
            faults: FaultTracker::new(
                config.fault_threshold,
                Duration::from_secs(config.fault_window_seconds),
            ),
            health: HealthChecker::new(Duration::from_secs(config.health_timeout_seconds)),
            broker,
            migrations: pool.map(MigrationRunner::new),
            audit,
            config,
        }
    }

    /// Prepare host-owned storage (the audit table) before serving.
    pub async fn bootstrap(&self) -> AppResult<()> {
        self.audit.bootstrap().await
    }

    /// Register an extension. Validates metadata and rejects duplicates;
    /// the extension lands in `Registered` and is not yet reachable.
    pub async fn register(&self, ext: Arc<dyn Extension>) -> AppResult<()> {
        let meta = ext.metadata();
        meta.validate()?;
        let name = meta.name.clone();

        {
            let mut extensions = self.extensions.write().await;
            if extensions.contains_key(&name) {
                return Err(AppError::duplicate_name(format!(
                    "extension already registered: {name}"
                )));
            }
            extensions.insert(name.clone(), ext.clone());
        }
        self.statuses
            .write()
            .await
            .insert(name.clone(), ExtensionStatus::registered());

        self.enforcer
            .register_extension(&name, ext.permissions(), ext.quota(), ext.declared_roles())
            .await;

        info!(extension = %name, version = %meta.version, "Extension registered");
        Ok(())
    }

    /// Enable an extension: initialize (once), run pending migrations,
    /// start, and mount its routes/hooks/middleware.
    ///
    /// A migration failure does not block the enable; the extension runs
    /// with degraded health until the migration is fixed. An operator may
    /// enable from `Failed` to retry.
    pub async fn enable(&self, name: &str) -> AppResult<ExtensionStatus> {
        let _guard = self.lifecycle.lock().await;

        let ext = self.get(name).await?;
        {
            let mut statuses = self.statuses.write().await;
            let status = statuses
                .get_mut(name)
                .ok_or_else(|| AppError::not_found(format!("extension not found: {name}")))?;
            if status.state == ExtensionState::Running {
                return Err(AppError::already_running(format!(
                    "extension already running: {name}"
                )));
            }
            status.state = ExtensionState::Initializing;
        }

        let initialized = self
            .statuses
            .read()
            .await
            .get(name)
            .map(|s| s.initialized)
            .unwrap_or(false);

        let mut migration_error = None;
        if !initialized {
            if let Err(err) = self.run_migrations(&ext).await {
                warn!(extension = %name, error = %err, "Migrations failed; continuing enable");
                migration_error = Some(err.message.clone());
            }
            let scope = self.broker.scope_for(&ext);
            if let Err(err) = ext.initialize(scope).await {
                self.mark_failed(name, format!("initialize failed: {}", err.message))
                    .await;
                return Err(AppError::lifecycle(format!(
                    "extension '{name}' failed to initialize: {}",
                    err.message
                )));
            }
        }

        if let Err(err) = ext.start().await {
            self.mark_failed(name, format!("start failed: {}", err.message))
                .await;
            return Err(AppError::lifecycle(format!(
                "extension '{name}' failed to start: {}",
                err.message
            )));
        }

        let order = self.enable_seq.fetch_add(1, Ordering::Relaxed);
        let table = match self.build_table_with(name, &ext, order).await {
            Ok(table) => table,
            Err(err) => {
                if let Err(stop_err) = ext.stop().await {
                    warn!(extension = %name, error = %stop_err, "Stop after failed mount");
                }
                self.mark_failed(name, err.message.clone()).await;
                return Err(err);
            }
        };
        self.dispatch.swap(table).await;
        self.orders.write().await.insert(name.to_string(), order);
        self.faults.clear(name);

        let status = {
            let mut statuses = self.statuses.write().await;
            let status = statuses
                .get_mut(name)
                .ok_or_else(|| AppError::not_found(format!("extension not found: {name}")))?;
            status.state = ExtensionState::Running;
            status.enabled_at = Some(Utc::now());
            status.initialized = true;
            status.last_error = migration_error;
            status.clone()
        };

        info!(extension = %name, "Extension enabled");
        Ok(status)
    }

    /// Disable an extension: unmount it, then call its stop entry point.
    ///
    /// Idempotent for an already-disabled extension. The swap happens before
    /// `stop`, so no request can reach the extension while it is stopping.
    pub async fn disable(&self, name: &str) -> AppResult<ExtensionStatus> {
        let _guard = self.lifecycle.lock().await;

        let ext = self.get(name).await?;
        let state = self
            .statuses
            .read()
            .await
            .get(name)
            .map(|s| s.state)
            .ok_or_else(|| AppError::not_found(format!("extension not found: {name}")))?;

        if state == ExtensionState::Disabled {
            return self.status(name).await;
        }

        let was_running = state == ExtensionState::Running;
        if was_running {
            self.orders.write().await.remove(name);
            let table = self.build_table_without(name).await?;
            self.dispatch.swap(table).await;
        }

        if was_running {
            if let Err(err) = ext.stop().await {
                warn!(extension = %name, error = %err, "Stop entry point failed");
            }
        }

        let status = {
            let mut statuses = self.statuses.write().await;
            let status = statuses
                .get_mut(name)
                .ok_or_else(|| AppError::not_found(format!("extension not found: {name}")))?;
            status.state = ExtensionState::Disabled;
            status.clone()
        };

        info!(extension = %name, "Extension disabled");
        Ok(status)
    }

    /// Enable every registered extension, logging failures instead of
    /// propagating them. Used at startup when auto-enable is configured.
    pub async fn enable_all(&self) {
        let names: Vec<String> = self.extensions.read().await.keys().cloned().collect();
        for name in names {
            if let Err(err) = self.enable(&name).await {
                error!(extension = %name, error = %err, "Auto-enable failed");
            }
        }
    }

    /// All registered extensions with their statuses, sorted by name.
    pub async fn list(&self) -> Vec<(ExtensionMetadata, ExtensionStatus)> {
        let extensions = self.extensions.read().await;
        let statuses = self.statuses.read().await;
        let mut result: Vec<_> = extensions
            .iter()
            .filter_map(|(name, ext)| {
                statuses.get(name).map(|s| (ext.metadata(), s.clone()))
            })
            .collect();
        result.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        result
    }

    /// Metadata for one extension.
    pub async fn metadata(&self, name: &str) -> AppResult<ExtensionMetadata> {
        Ok(self.get(name).await?.metadata())
    }

    /// Status for one extension.
    pub async fn status(&self, name: &str) -> AppResult<ExtensionStatus> {
        self.statuses
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("extension not found: {name}")))
    }

    /// Probe an extension's health on demand.
    ///
    /// A running extension with a recorded migration error reports degraded
    /// even when its own probe succeeds.
    pub async fn health(&self, name: &str) -> AppResult<HealthStatus> {
        let ext = self.get(name).await?;
        let status = self.status(name).await?;
        let mut health = self.health.probe(&ext, status.state).await;
        if status.state == ExtensionState::Running
            && health.status == HealthLevel::Healthy
            && status.last_error.is_some()
        {
            health.status = HealthLevel::Degraded;
            health.message = status.last_error.unwrap_or_default();
        }

        self.statuses
            .write()
            .await
            .entry(name.to_string())
            .and_modify(|s| s.health = Some(health.clone()));
        Ok(health)
    }

    /// Metrics snapshot for one extension.
    pub async fn metrics(&self, name: &str) -> AppResult<MetricsSnapshot> {
        self.get(name).await?;
        Ok(self
            .metrics
            .snapshot(name, self.enforcer.memory_estimate_mb(name)))
    }

    /// Recent audit entries for one extension, newest first.
    pub async fn audit(&self, name: &str, limit: usize) -> AppResult<Vec<AuditEntry>> {
        self.get(name).await?;
        Ok(self.enforcer.audit().recent(name, limit).await)
    }

    /// The declared configuration schema of an extension.
    pub async fn config_schema(&self, name: &str) -> AppResult<ConfigSchema> {
        let ext = self.get(name).await?;
        ext.as_configurable()
            .map(|c| c.config_schema())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "extension '{name}' does not accept configuration"
                ))
            })
    }

    /// The currently active configuration of an extension.
    pub async fn current_config(&self, name: &str) -> AppResult<serde_json::Value> {
        let ext = self.get(name).await?;
        ext.as_configurable()
            .map(|c| c.current_config())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "extension '{name}' does not accept configuration"
                ))
            })
    }

    /// Validate a configuration document against the extension's schema and
    /// apply it atomically. On any validation error the previous
    /// configuration stays in force.
    pub async fn apply_config(&self, name: &str, document: serde_json::Value) -> AppResult<()> {
        let ext = self.get(name).await?;
        let configurable = ext.as_configurable().ok_or_else(|| {
            AppError::validation(format!(
                "extension '{name}' does not accept configuration"
            ))
        })?;

        let errors = configurable.config_schema().validate(&document);
        if !errors.is_empty() {
            return Err(AppError::validation(format!(
                "invalid configuration for extension '{name}': {}",
                errors.join("; ")
            )));
        }

        configurable.apply_config(document).await?;
        info!(extension = %name, "Configuration applied");
        Ok(())
    }

    /// Run pending migrations for one extension on demand.
    pub async fn migrate(&self, name: &str) -> AppResult<u32> {
        let ext = self.get(name).await?;
        let runner = self.runner()?;
        let migratable = ext.as_migratable().ok_or_else(|| {
            AppError::validation(format!("extension '{name}' declares no migrations"))
        })?;
        let applied = runner
            .run(name, &ext.metadata().schema_name(), &migratable.migrations())
            .await?;
        // A successful run clears any recorded migration failure.
        self.statuses
            .write()
            .await
            .entry(name.to_string())
            .and_modify(|s| s.last_error = None);
        Ok(applied)
    }

    /// Roll back one applied migration version.
    pub async fn rollback(&self, name: &str, version: i64) -> AppResult<()> {
        let ext = self.get(name).await?;
        let runner = self.runner()?;
        let migratable = ext.as_migratable().ok_or_else(|| {
            AppError::validation(format!("extension '{name}' declares no migrations"))
        })?;
        runner
            .rollback(
                name,
                &ext.metadata().schema_name(),
                &migratable.migrations(),
                version,
            )
            .await
    }

    /// Migration ledger status for one extension.
    pub async fn migration_status(&self, name: &str) -> AppResult<Vec<MigrationRecord>> {
        let ext = self.get(name).await?;
        let runner = self.runner()?;
        let migrations = ext
            .as_migratable()
            .map(|m| m.migrations())
            .unwrap_or_default();
        runner.status(name, &migrations).await
    }

    /// Record a runtime fault for an extension. When the extension crosses
    /// the configured threshold it is disabled automatically; returns `true`
    /// if that happened.
    pub async fn record_fault(&self, name: &str) -> bool {
        if !self.faults.record(name) {
            return false;
        }
        warn!(
            extension = %name,
            threshold = self.config.fault_threshold,
            "Fault threshold exceeded; disabling extension"
        );
        match self.disable(name).await {
            Ok(_) => true,
            Err(err) => {
                error!(extension = %name, error = %err, "Automatic disable failed");
                false
            }
        }
    }

    /// The shared dispatch table slot consulted by the host router.
    pub fn dispatch(&self) -> Arc<SharedDispatch> {
        self.dispatch.clone()
    }

    /// The hook pipeline.
    pub fn pipeline(&self) -> Arc<HookPipeline> {
        self.pipeline.clone()
    }

    /// The security enforcer.
    pub fn enforcer(&self) -> Arc<SecurityEnforcer> {
        self.enforcer.clone()
    }

    /// The metrics collector.
    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Runtime configuration the registry was built with.
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.config
    }

    async fn get(&self, name: &str) -> AppResult<Arc<dyn Extension>> {
        self.extensions
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("extension not found: {name}")))
    }

    fn runner(&self) -> AppResult<&MigrationRunner> {
        self.migrations.as_ref().ok_or_else(|| {
            AppError::service_unavailable("no database is configured for this host")
        })
    }

    async fn run_migrations(&self, ext: &Arc<dyn Extension>) -> AppResult<()> {
        let Some(migratable) = ext.as_migratable() else {
            return Ok(());
        };
        let Some(runner) = self.migrations.as_ref() else {
            return Ok(());
        };
        let meta = ext.metadata();
        runner
            .run(&meta.name, &meta.schema_name(), &migratable.migrations())
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, name: &str, message: String) {
        error!(extension = %name, error = %message, "Extension failed");
        let mut statuses = self.statuses.write().await;
        if let Some(status) = statuses.get_mut(name) {
            status.state = ExtensionState::Failed;
            status.last_error = Some(message);
        }
    }

    /// Build a table of all running extensions plus `ext`.
    async fn build_table_with(
        &self,
        name: &str,
        ext: &Arc<dyn Extension>,
        order: u64,
    ) -> AppResult<DispatchTable> {
        let mut entries = self.running_entries().await;
        entries.retain(|(e, _)| e.metadata().name != name);
        entries.push((ext.clone(), order));
        entries.sort_by_key(|(_, order)| *order);
        DispatchTable::build(&entries)
    }

    /// Build a table of all running extensions except `name`.
    async fn build_table_without(&self, name: &str) -> AppResult<DispatchTable> {
        let mut entries = self.running_entries().await;
        entries.retain(|(e, _)| e.metadata().name != name);
        entries.sort_by_key(|(_, order)| *order);
        DispatchTable::build(&entries)
    }

    async fn running_entries(&self) -> Vec<(Arc<dyn Extension>, u64)> {
        let orders = self.orders.read().await;
        let extensions = self.extensions.read().await;
        orders
            .iter()
            .filter_map(|(name, order)| {
                extensions.get(name).map(|ext| (ext.clone(), *order))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exthub_core::traits::{RouteDef, RouteProvider, ServiceScope};
    use exthub_core::types::AuthRequirement;
    use http::Method;
    use std::sync::atomic::AtomicU32;

    struct Recorder {
        name: &'static str,
        init_calls: AtomicU32,
        start_calls: AtomicU32,
        stop_calls: AtomicU32,
    }

    impl Recorder {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                init_calls: AtomicU32::new(0),
                start_calls: AtomicU32::new(0),
                stop_calls: AtomicU32::new(0),
            })
        }
    }

    struct Echo;

    #[async_trait]
    impl exthub_core::traits::ExtensionHandler for Echo {
        async fn handle(
            &self,
            _req: exthub_core::types::ExtensionRequest,
        ) -> AppResult<exthub_core::types::ExtensionResponse> {
            Ok(exthub_core::types::ExtensionResponse::ok(
                serde_json::json!({}),
            ))
        }
    }

    #[async_trait]
    impl Extension for Recorder {
        fn metadata(&self) -> ExtensionMetadata {
            ExtensionMetadata {
                name: self.name.to_string(),
                version: "1.0.0".to_string(),
                author: "test".to_string(),
                ..Default::default()
            }
        }

        async fn initialize(&self, _services: ServiceScope) -> AppResult<()> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn start(&self) -> AppResult<()> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> AppResult<()> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_route_provider(&self) -> Option<&dyn RouteProvider> {
            Some(self)
        }
    }

    impl RouteProvider for Recorder {
        fn routes(&self) -> Vec<RouteDef> {
            vec![RouteDef::new(
                Method::GET,
                "/dashboard",
                AuthRequirement::Public,
                Arc::new(Echo),
            )]
        }
    }

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::new(RuntimeConfig::default(), None)
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let registry = registry();
        registry.register(Recorder::new("webhooks")).await.unwrap();
        let err = registry.register(Recorder::new("webhooks")).await.unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::DuplicateName);
        assert_eq!(
            err.message,
            "extension already registered: webhooks"
        );
    }

    #[tokio::test]
    async fn enable_unknown_extension_is_not_found() {
        let registry = registry();
        let err = registry.enable("ghost").await.unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn enable_mounts_routes_and_double_enable_fails() {
        let registry = registry();
        registry.register(Recorder::new("webhooks")).await.unwrap();

        let status = registry.enable("webhooks").await.unwrap();
        assert_eq!(status.state, ExtensionState::Running);
        assert!(registry.dispatch().current().await.is_mounted("webhooks"));

        let err = registry.enable("webhooks").await.unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::AlreadyRunning);
    }

    #[tokio::test]
    async fn disable_unmounts_and_is_idempotent() {
        let registry = registry();
        let ext = Recorder::new("webhooks");
        registry.register(ext.clone()).await.unwrap();
        registry.enable("webhooks").await.unwrap();

        let status = registry.disable("webhooks").await.unwrap();
        assert_eq!(status.state, ExtensionState::Disabled);
        assert!(!registry.dispatch().current().await.is_mounted("webhooks"));
        assert_eq!(ext.stop_calls.load(Ordering::SeqCst), 1);

        // Second disable is a no-op, not an error.
        let status = registry.disable("webhooks").await.unwrap();
        assert_eq!(status.state, ExtensionState::Disabled);
        assert_eq!(ext.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn re_enable_mounts_routes_exactly_once() {
        let registry = registry();
        let ext = Recorder::new("webhooks");
        registry.register(ext.clone()).await.unwrap();

        registry.enable("webhooks").await.unwrap();
        registry.disable("webhooks").await.unwrap();
        registry.enable("webhooks").await.unwrap();

        let table = registry.dispatch().current().await;
        assert_eq!(table.route_count(), 1);
        // Initialization runs once across the whole lifecycle.
        assert_eq!(ext.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ext.start_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_extension_reports_stopped_health() {
        let registry = registry();
        registry.register(Recorder::new("webhooks")).await.unwrap();
        let health = registry.health("webhooks").await.unwrap();
        assert_eq!(health.status, HealthLevel::Stopped);
    }

    // Startup calls bootstrap before serving; with a database configured it
    // creates the audit table, without one it must still succeed so audit
    // stays in memory.
    #[tokio::test]
    async fn bootstrap_without_database_succeeds() {
        let registry = registry();
        registry.bootstrap().await.unwrap();
    }
}
