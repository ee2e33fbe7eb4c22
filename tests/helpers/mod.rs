//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use exthub_api::AppState;
use exthub_core::config::AppConfig;
use exthub_core::types::{
    AuthRequirement, ExtensionMetadata, ExtensionRequest, ExtensionResponse, Quota,
};
use exthub_core::AppResult;
use exthub_core::hooks::HookRegistration;
use exthub_core::traits::{Extension, ExtensionHandler, HookProvider, RouteDef, RouteProvider};
use exthub_runtime::ExtensionRegistry;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The registry behind the router
    pub registry: Arc<ExtensionRegistry>,
    /// Scratch directory for extension storage and configuration
    #[allow(dead_code)]
    scratch: tempfile::TempDir,
}

impl TestApp {
    /// Create a test application with the webhooks extension registered.
    pub async fn new() -> Self {
        Self::with_extensions(vec![Arc::new(ext_webhooks::WebhooksExtension::new())]).await
    }

    /// Create a test application with the given extensions registered.
    pub async fn with_extensions(extensions: Vec<Arc<dyn Extension>>) -> Self {
        let scratch = tempfile::tempdir().expect("Failed to create scratch dir");

        let mut config = AppConfig::default();
        config.runtime.storage_root = scratch
            .path()
            .join("storage")
            .to_string_lossy()
            .into_owned();
        config.runtime.config_dir = scratch
            .path()
            .join("config")
            .to_string_lossy()
            .into_owned();

        let registry = Arc::new(ExtensionRegistry::new(config.runtime.clone(), None));
        for ext in extensions {
            registry.register(ext).await.expect("Failed to register");
        }

        let state = AppState::new(Arc::new(config), Arc::clone(&registry));
        let router = exthub_api::build_router(state);

        Self {
            router,
            registry,
            scratch,
        }
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Headers for an authenticated admin user
    pub fn admin_headers() -> [(&'static str, &'static str); 3] {
        [
            ("x-auth-user-id", "7f9c24e5-2a31-47a4-9f1e-6d2b8b6e0a11"),
            ("x-auth-username", "root"),
            ("x-auth-roles", "admin"),
        ]
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// A minimal extension with one public route and counters on its entry points.
pub struct StubExtension {
    name: String,
    quota: Option<Quota>,
    hooks: Vec<HookRegistration>,
    pub init_calls: AtomicU32,
}

impl StubExtension {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            quota: None,
            hooks: Vec::new(),
            init_calls: AtomicU32::new(0),
        }
    }

    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn with_hooks(mut self, hooks: Vec<HookRegistration>) -> Self {
        self.hooks = hooks;
        self
    }
}

#[async_trait]
impl Extension for StubExtension {
    fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata {
            name: self.name.clone(),
            version: "0.1.0".to_string(),
            description: "test stub".to_string(),
            author: "tests".to_string(),
            ..Default::default()
        }
    }

    fn quota(&self) -> Option<Quota> {
        self.quota.clone()
    }

    async fn initialize(&self, _services: exthub_core::traits::ServiceScope) -> AppResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_route_provider(&self) -> Option<&dyn RouteProvider> {
        Some(self)
    }

    fn as_hook_provider(&self) -> Option<&dyn HookProvider> {
        if self.hooks.is_empty() { None } else { Some(self) }
    }
}

impl RouteProvider for StubExtension {
    fn routes(&self) -> Vec<RouteDef> {
        vec![RouteDef::new(
            Method::GET,
            "/ping",
            AuthRequirement::Public,
            Arc::new(PingHandler),
        )]
    }
}

impl HookProvider for StubExtension {
    fn hooks(&self) -> Vec<HookRegistration> {
        self.hooks.clone()
    }
}

struct PingHandler;

#[async_trait]
impl ExtensionHandler for PingHandler {
    async fn handle(&self, _req: ExtensionRequest) -> AppResult<ExtensionResponse> {
        Ok(ExtensionResponse::ok(json!({ "pong": true })))
    }
}
