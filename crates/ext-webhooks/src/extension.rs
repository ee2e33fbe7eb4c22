//! The webhooks extension and its capability declarations.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use exthub_sdk::extension_metadata;
use exthub_sdk::prelude::*;

use crate::delivery::DeliveryHook;
use crate::handlers::{CreateEndpointHandler, DashboardHandler, ListEndpointsHandler};

/// Role allowed to manage webhook endpoints.
pub const ADMIN_ROLE: &str = "webhook-admin";

/// Active configuration of the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhooksConfig {
    /// URL deliveries are posted to. Empty means delivery is off.
    #[serde(default)]
    pub delivery_url: String,
    /// Delivery attempts per event.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

fn default_retry_limit() -> u32 {
    3
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            delivery_url: String::new(),
            retry_limit: default_retry_limit(),
        }
    }
}

/// Shared state behind the extension, its handlers, and its hook.
pub struct WebhooksState {
    services: RwLock<Option<ServiceScope>>,
    config: RwLock<WebhooksConfig>,
    client: reqwest::Client,
}

impl WebhooksState {
    fn new() -> Self {
        Self {
            services: RwLock::new(None),
            config: RwLock::new(WebhooksConfig::default()),
            client: reqwest::Client::new(),
        }
    }

    /// The service scope, once initialized.
    pub fn services(&self) -> AppResult<ServiceScope> {
        self.services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| AppError::lifecycle("webhooks extension is not initialized"))
    }

    /// The active configuration.
    pub fn config(&self) -> WebhooksConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The HTTP client used for deliveries.
    pub fn client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

/// Webhook delivery extension.
pub struct WebhooksExtension {
    state: Arc<WebhooksState>,
}

impl WebhooksExtension {
    pub fn new() -> Self {
        Self {
            state: Arc::new(WebhooksState::new()),
        }
    }

    /// Shared state handle, for tests.
    pub fn state(&self) -> Arc<WebhooksState> {
        self.state.clone()
    }
}

impl Default for WebhooksExtension {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for WebhooksExtension {
    fn metadata(&self) -> ExtensionMetadata {
        extension_metadata!(
            name: "webhooks",
            version: "1.0.0",
            description: "Outbound webhook delivery",
            author: "ExtHub Team",
            tags: ["notifications", "http"]
        )
    }

    fn permissions(&self) -> Vec<Permission> {
        vec![
            Permission {
                name: "webhooks.database".to_string(),
                description: "Endpoint and delivery bookkeeping".to_string(),
                resource: "database".to_string(),
                actions: vec!["read".to_string(), "execute".to_string()],
            },
            Permission {
                name: "webhooks.storage".to_string(),
                description: "Delivery payload archive".to_string(),
                resource: "storage".to_string(),
                actions: vec!["read".to_string(), "write".to_string()],
            },
        ]
    }

    fn declared_roles(&self) -> Vec<String> {
        vec![ADMIN_ROLE.to_string()]
    }

    async fn initialize(&self, services: ServiceScope) -> AppResult<()> {
        services.logger.info("webhooks extension initialized");
        *self
            .state
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(services);
        Ok(())
    }

    async fn health(&self) -> HealthStatus {
        let initialized = self
            .state
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some();
        if !initialized {
            return HealthStatus::with_message(HealthLevel::Unhealthy, "not initialized");
        }
        if self.state.config().delivery_url.is_empty() {
            return HealthStatus::with_message(
                HealthLevel::Degraded,
                "delivery_url is not configured; deliveries are off",
            );
        }
        HealthStatus::healthy()
    }

    fn as_route_provider(&self) -> Option<&dyn RouteProvider> {
        Some(self)
    }

    fn as_hook_provider(&self) -> Option<&dyn HookProvider> {
        Some(self)
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }

    fn as_migratable(&self) -> Option<&dyn Migratable> {
        Some(self)
    }
}

impl RouteProvider for WebhooksExtension {
    fn routes(&self) -> Vec<RouteDef> {
        vec![
            RouteDef::new(
                Method::GET,
                "/dashboard",
                AuthRequirement::Public,
                Arc::new(DashboardHandler::new(self.state.clone())),
            ),
            RouteDef::new(
                Method::GET,
                "/endpoints",
                AuthRequirement::RequireAuth,
                Arc::new(ListEndpointsHandler::new(self.state.clone())),
            ),
            RouteDef::new(
                Method::POST,
                "/endpoints",
                AuthRequirement::RequireRole(ADMIN_ROLE.to_string()),
                Arc::new(CreateEndpointHandler::new(self.state.clone())),
            ),
        ]
    }
}

impl HookProvider for WebhooksExtension {
    fn hooks(&self) -> Vec<HookRegistration> {
        vec![HookRegistration::new(
            HookType::PostRequest,
            100,
            Arc::new(DeliveryHook::new(self.state.clone())),
        )]
    }
}

#[async_trait]
impl Configurable for WebhooksExtension {
    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .field(
                "delivery_url",
                ConfigFieldKind::String,
                true,
                "URL deliveries are posted to",
            )
            .field(
                "retry_limit",
                ConfigFieldKind::Integer,
                false,
                "Delivery attempts per event",
            )
    }

    fn current_config(&self) -> Value {
        let config = self.state.config();
        json!({
            "delivery_url": config.delivery_url,
            "retry_limit": config.retry_limit,
        })
    }

    async fn apply_config(&self, config: Value) -> AppResult<()> {
        let parsed: WebhooksConfig = serde_json::from_value(config)?;
        *self
            .state
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = parsed;
        Ok(())
    }
}

impl Migratable for WebhooksExtension {
    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                version: 1,
                description: "create endpoints table".to_string(),
                up_sql: r#"
                    CREATE TABLE endpoints (
                        id BIGSERIAL PRIMARY KEY,
                        url TEXT NOT NULL,
                        event TEXT NOT NULL,
                        active BOOLEAN NOT NULL DEFAULT TRUE,
                        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                    )
                "#
                .to_string(),
                down_sql: "DROP TABLE endpoints".to_string(),
            },
            Migration {
                version: 2,
                description: "create deliveries table".to_string(),
                up_sql: r#"
                    CREATE TABLE deliveries (
                        id BIGSERIAL PRIMARY KEY,
                        endpoint_id BIGINT REFERENCES endpoints (id) ON DELETE CASCADE,
                        status_code INT,
                        delivered_at TIMESTAMPTZ NOT NULL DEFAULT now()
                    )
                "#
                .to_string(),
                down_sql: "DROP TABLE deliveries".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_valid() {
        let ext = WebhooksExtension::new();
        assert!(ext.metadata().validate().is_ok());
        assert_eq!(ext.metadata().name, "webhooks");
    }

    #[test]
    fn config_schema_rejects_missing_url() {
        let ext = WebhooksExtension::new();
        let errors = ext.config_schema().validate(&json!({ "retry_limit": 5 }));
        assert!(errors.iter().any(|e| e.contains("delivery_url")));
    }

    #[tokio::test]
    async fn apply_config_replaces_the_document() {
        let ext = WebhooksExtension::new();
        ext.apply_config(json!({
            "delivery_url": "https://example.com/hook",
            "retry_limit": 5,
        }))
        .await
        .unwrap();
        let config = ext.state().config();
        assert_eq!(config.delivery_url, "https://example.com/hook");
        assert_eq!(config.retry_limit, 5);
    }

    #[tokio::test]
    async fn health_degrades_without_delivery_url() {
        let ext = WebhooksExtension::new();
        let harness = exthub_sdk::harness::TestHarness::new("webhooks");
        harness.initialize(&ext).await.unwrap();
        assert_eq!(ext.health().await.status, HealthLevel::Degraded);

        ext.apply_config(json!({ "delivery_url": "https://example.com/hook" }))
            .await
            .unwrap();
        assert_eq!(ext.health().await.status, HealthLevel::Healthy);
    }

    #[test]
    fn migrations_ascend() {
        let ext = WebhooksExtension::new();
        let versions: Vec<i64> = ext.migrations().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
