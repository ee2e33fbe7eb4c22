//! The service broker — builds the scoped service surface each extension
//! receives at initialization.
//!
//! Extensions never see a raw pool, a filesystem path, or the host logger;
//! every accessor here is pre-bound to the extension's name, schema, and
//! storage prefix, and checks capabilities before touching the resource.

pub mod config;
pub mod database;
pub mod logger;
pub mod storage;

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use sqlx::PgPool;

use exthub_core::traits::{Extension, ServiceScope};

use crate::dispatch::SharedDispatch;
use crate::hooks::HookPipeline;
use crate::metrics::MetricsCollector;
use crate::security::SecurityEnforcer;

use self::config::ExtensionConfigAccessor;
use self::database::{NullScopedDatabase, PostgresScopedDatabase};
use self::logger::TracingScopedLogger;
use self::storage::FsScopedStorage;

/// Builds [`ServiceScope`]s bound to individual extensions.
pub struct ServiceBroker {
    pool: Option<PgPool>,
    storage_root: PathBuf,
    enforcer: Arc<SecurityEnforcer>,
    metrics: Arc<MetricsCollector>,
    dispatch: Arc<SharedDispatch>,
    pipeline: Arc<HookPipeline>,
}

impl ServiceBroker {
    pub fn new(
        pool: Option<PgPool>,
        storage_root: PathBuf,
        enforcer: Arc<SecurityEnforcer>,
        metrics: Arc<MetricsCollector>,
        dispatch: Arc<SharedDispatch>,
        pipeline: Arc<HookPipeline>,
    ) -> Self {
        Self {
            pool,
            storage_root,
            enforcer,
            metrics,
            dispatch,
            pipeline,
        }
    }

    /// Build the scope handed to `ext` at initialization.
    ///
    /// The config accessor holds a weak reference back to the extension, so
    /// an extension keeping its scope alive does not keep itself alive.
    pub fn scope_for(&self, ext: &Arc<dyn Extension>) -> ServiceScope {
        let meta = ext.metadata();
        let name = meta.name.clone();

        let db: Arc<dyn exthub_core::traits::ScopedDatabase> = match &self.pool {
            Some(pool) => Arc::new(PostgresScopedDatabase::new(
                pool.clone(),
                name.clone(),
                meta.schema_name(),
                self.enforcer.clone(),
                self.metrics.clone(),
                self.dispatch.clone(),
                self.pipeline.clone(),
            )),
            None => Arc::new(NullScopedDatabase::new(meta.schema_name())),
        };

        let weak: Weak<dyn Extension> = Arc::downgrade(ext);

        ServiceScope {
            extension: name.clone(),
            db,
            storage: Arc::new(FsScopedStorage::new(
                self.storage_root.join(&name),
                name.clone(),
                self.enforcer.clone(),
            )),
            logger: Arc::new(TracingScopedLogger::new(name.clone())),
            config: Arc::new(ExtensionConfigAccessor::new(weak)),
        }
    }
}
