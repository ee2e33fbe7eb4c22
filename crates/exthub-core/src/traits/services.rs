//! Scoped service traits exposed to extensions by the service broker.
//!
//! These are the only paths by which an extension touches host resources.
//! The runtime provides production implementations; the test harness swaps
//! in fakes behind the same traits.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::result::AppResult;
use crate::types::schema::ConfigSchema;

/// Database access scoped to the extension's private schema (`ext_<name>`).
///
/// Every call is permission-checked and metered before execution.
#[async_trait]
pub trait ScopedDatabase: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> AppResult<u64>;

    /// Fetch all rows as JSON objects.
    async fn fetch_all(&self, sql: &str, params: Vec<Value>) -> AppResult<Vec<Value>>;

    /// Fetch at most one row as a JSON object.
    async fn fetch_optional(&self, sql: &str, params: Vec<Value>) -> AppResult<Option<Value>>;

    /// The schema name queries run against.
    fn schema(&self) -> &str;
}

/// Blob storage restricted to a path prefix owned by the extension.
#[async_trait]
pub trait ScopedStorage: Send + Sync {
    /// Write a blob under the extension's prefix.
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Read a blob, if present.
    async fn get(&self, key: &str) -> AppResult<Option<Bytes>>;

    /// Delete a blob.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// List keys under the extension's prefix.
    async fn list(&self) -> AppResult<Vec<String>>;
}

/// Logger pre-tagged with the extension name and correlation id.
pub trait ScopedLogger: Send + Sync {
    /// Log at debug level.
    fn debug(&self, message: &str);
    /// Log at info level.
    fn info(&self, message: &str);
    /// Log at warn level.
    fn warn(&self, message: &str);
    /// Log at error level.
    fn error(&self, message: &str);
}

/// Configuration accessor bound to the extension's declared schema.
#[async_trait]
pub trait ScopedConfig: Send + Sync {
    /// The declared schema.
    fn schema(&self) -> ConfigSchema;

    /// The currently active configuration document.
    async fn current(&self) -> Value;
}

/// The full service scope handed to an extension at initialization.
///
/// One scope per extension; accessors are shareable across the extension's
/// handlers and hooks.
#[derive(Clone)]
pub struct ServiceScope {
    /// The owning extension's name.
    pub extension: String,
    /// Schema-scoped database access.
    pub db: Arc<dyn ScopedDatabase>,
    /// Prefix-scoped blob storage.
    pub storage: Arc<dyn ScopedStorage>,
    /// Pre-tagged logger.
    pub logger: Arc<dyn ScopedLogger>,
    /// Schema-bound configuration access.
    pub config: Arc<dyn ScopedConfig>,
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("extension", &self.extension)
            .finish()
    }
}
