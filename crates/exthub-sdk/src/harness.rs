//! In-memory test harness for exercising extensions without a host.
//!
//! The harness provides fake implementations of every scoped service
//! behind the same traits the runtime implements, so extension tests can
//! drive `initialize`, handlers, and hooks directly and then assert on the
//! recorded interactions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use exthub_core::AppResult;
use exthub_core::traits::{
    Extension, ScopedConfig, ScopedDatabase, ScopedLogger, ScopedStorage, ServiceScope,
};
use exthub_core::types::ConfigSchema;

/// One recorded database call.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    /// The SQL text.
    pub sql: String,
    /// Bound parameters.
    pub params: Vec<Value>,
}

/// Fake database recording every call and replaying queued results.
#[derive(Default)]
pub struct FakeDatabase {
    schema: String,
    queries: Mutex<Vec<RecordedQuery>>,
    queued_rows: Mutex<Vec<Vec<Value>>>,
}

impl FakeDatabase {
    fn new(schema: String) -> Self {
        Self {
            schema,
            queries: Mutex::new(Vec::new()),
            queued_rows: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result set for the next fetch call.
    pub fn queue_rows(&self, rows: Vec<Value>) {
        self.queued_rows.lock().unwrap().push(rows);
    }

    /// All recorded calls, in order.
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

#[async_trait]
impl ScopedDatabase for FakeDatabase {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> AppResult<u64> {
        self.record(sql, &params);
        Ok(1)
    }

    async fn fetch_all(&self, sql: &str, params: Vec<Value>) -> AppResult<Vec<Value>> {
        self.record(sql, &params);
        let mut queued = self.queued_rows.lock().unwrap();
        if queued.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(queued.remove(0))
        }
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

/// Fake blob storage over a hash map.
#[derive(Default)]
pub struct FakeStorage {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl FakeStorage {
    /// Direct read access for assertions.
    pub fn snapshot(&self) -> HashMap<String, Bytes> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScopedStorage for FakeStorage {
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.blobs.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<Bytes>> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<String>> {
        let mut keys: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Fake logger capturing messages for assertions.
#[derive(Default)]
pub struct FakeLogger {
    messages: Mutex<Vec<(String, String)>>,
}

impl FakeLogger {
    /// All captured `(level, message)` pairs.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    fn push(&self, level: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level.to_string(), message.to_string()));
    }
}

impl ScopedLogger for FakeLogger {
    fn debug(&self, message: &str) {
        self.push("debug", message);
    }

    fn info(&self, message: &str) {
        self.push("info", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }

    fn error(&self, message: &str) {
        self.push("error", message);
    }
}

/// Fake configuration accessor holding a mutable document.
pub struct FakeConfig {
    schema: ConfigSchema,
    document: Mutex<Value>,
}

impl FakeConfig {
    fn new(schema: ConfigSchema) -> Self {
        Self {
            schema,
            document: Mutex::new(Value::Null),
        }
    }

    /// Replace the active document.
    pub fn set(&self, document: Value) {
        *self.document.lock().unwrap() = document;
    }
}

#[async_trait]
impl ScopedConfig for FakeConfig {
    fn schema(&self) -> ConfigSchema {
        self.schema.clone()
    }

    async fn current(&self) -> Value {
        self.document.lock().unwrap().clone()
    }
}

/// An in-memory service scope plus handles to its fakes.
pub struct TestHarness {
    /// The fake database.
    pub db: Arc<FakeDatabase>,
    /// The fake storage.
    pub storage: Arc<FakeStorage>,
    /// The fake logger.
    pub logger: Arc<FakeLogger>,
    /// The fake configuration accessor.
    pub config: Arc<FakeConfig>,
    extension: String,
}

impl TestHarness {
    /// A harness scoped to the named extension.
    pub fn new(extension: &str) -> Self {
        Self::with_schema(extension, ConfigSchema::default())
    }

    /// A harness with a declared configuration schema.
    pub fn with_schema(extension: &str, schema: ConfigSchema) -> Self {
        let db_schema = format!("ext_{}", extension.replace('-', "_"));
        Self {
            db: Arc::new(FakeDatabase::new(db_schema)),
            storage: Arc::new(FakeStorage::default()),
            logger: Arc::new(FakeLogger::default()),
            config: Arc::new(FakeConfig::new(schema)),
            extension: extension.to_string(),
        }
    }

    /// The service scope to hand to the extension under test.
    pub fn scope(&self) -> ServiceScope {
        ServiceScope {
            extension: self.extension.clone(),
            db: self.db.clone(),
            storage: self.storage.clone(),
            logger: self.logger.clone(),
            config: self.config.clone(),
        }
    }

    /// Initialize an extension against this harness's scope.
    pub async fn initialize(&self, ext: &dyn Extension) -> AppResult<()> {
        ext.initialize(self.scope()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fake_database_replays_queued_rows() {
        let harness = TestHarness::new("webhooks");
        harness.db.queue_rows(vec![json!({"id": 1})]);

        let rows = harness
            .db
            .fetch_all("SELECT * FROM endpoints", vec![])
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"id": 1})]);
        assert!(harness
            .db
            .fetch_all("SELECT * FROM endpoints", vec![])
            .await
            .unwrap()
            .is_empty());
        assert_eq!(harness.db.queries().len(), 2);
        assert_eq!(harness.db.schema(), "ext_webhooks");
    }

    #[tokio::test]
    async fn fake_storage_round_trips() {
        let harness = TestHarness::new("webhooks");
        harness
            .storage
            .put("a/b", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(
            harness.storage.get("a/b").await.unwrap(),
            Some(Bytes::from_static(b"x"))
        );
        assert_eq!(harness.storage.list().await.unwrap(), vec!["a/b"]);
    }

    #[tokio::test]
    async fn fake_logger_captures_levels() {
        let harness = TestHarness::new("webhooks");
        harness.logger.info("hello");
        harness.logger.error("boom");
        let messages = harness.logger.messages();
        assert_eq!(messages[0], ("info".to_string(), "hello".to_string()));
        assert_eq!(messages[1], ("error".to_string(), "boom".to_string()));
    }
}
