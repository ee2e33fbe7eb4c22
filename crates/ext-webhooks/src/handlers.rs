//! Route handlers for the webhooks management surface.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use exthub_sdk::prelude::*;

use crate::extension::WebhooksState;

/// GET /ext/webhooks/dashboard
pub struct DashboardHandler {
    state: Arc<WebhooksState>,
}

impl DashboardHandler {
    pub fn new(state: Arc<WebhooksState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ExtensionHandler for DashboardHandler {
    async fn handle(&self, _req: ExtensionRequest) -> AppResult<ExtensionResponse> {
        let services = self.state.services()?;
        let endpoints = match services
            .db
            .fetch_optional(
                "SELECT count(*) AS endpoints FROM endpoints WHERE active",
                vec![],
            )
            .await
        {
            Ok(row) => row
                .and_then(|r| r.get("endpoints").and_then(|v| v.as_i64()))
                .unwrap_or(0)
                .into(),
            // Hosts without a database still get the dashboard.
            Err(err) if err.kind == ErrorKind::ServiceUnavailable => serde_json::Value::Null,
            Err(err) => return Err(err),
        };

        let config = self.state.config();
        Ok(ExtensionResponse::ok(json!({
            "endpoints": endpoints,
            "delivery_url": config.delivery_url,
            "retry_limit": config.retry_limit,
        })))
    }
}

/// GET /ext/webhooks/endpoints
pub struct ListEndpointsHandler {
    state: Arc<WebhooksState>,
}

impl ListEndpointsHandler {
    pub fn new(state: Arc<WebhooksState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ExtensionHandler for ListEndpointsHandler {
    async fn handle(&self, _req: ExtensionRequest) -> AppResult<ExtensionResponse> {
        let services = self.state.services()?;
        let rows = services
            .db
            .fetch_all(
                "SELECT id, url, event, active, created_at FROM endpoints ORDER BY id",
                vec![],
            )
            .await?;
        Ok(ExtensionResponse::ok(json!({ "endpoints": rows })))
    }
}

#[derive(Debug, Deserialize)]
struct CreateEndpointRequest {
    url: String,
    event: String,
}

/// POST /ext/webhooks/endpoints
pub struct CreateEndpointHandler {
    state: Arc<WebhooksState>,
}

impl CreateEndpointHandler {
    pub fn new(state: Arc<WebhooksState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ExtensionHandler for CreateEndpointHandler {
    async fn handle(&self, req: ExtensionRequest) -> AppResult<ExtensionResponse> {
        let body: CreateEndpointRequest = req.json()?;
        if body.url.is_empty() || body.event.is_empty() {
            return Err(AppError::validation("url and event are required"));
        }

        let services = self.state.services()?;
        services
            .db
            .execute(
                "INSERT INTO endpoints (url, event) VALUES ($1, $2)",
                vec![json!(body.url), json!(body.event)],
            )
            .await?;
        services
            .logger
            .info(&format!("endpoint registered for event '{}'", body.event));

        Ok(ExtensionResponse::with_status(
            201,
            json!({ "url": body.url, "event": body.event }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::WebhooksExtension;
    use exthub_sdk::harness::TestHarness;
    use http::Method;

    async fn state_with_harness() -> (Arc<WebhooksState>, TestHarness) {
        let ext = WebhooksExtension::new();
        let harness = TestHarness::new("webhooks");
        harness.initialize(&ext).await.unwrap();
        (ext.state(), harness)
    }

    #[tokio::test]
    async fn create_endpoint_inserts_and_returns_201() {
        let (state, harness) = state_with_harness().await;
        let handler = CreateEndpointHandler::new(state);

        let mut req = ExtensionRequest::new(Method::POST, "/endpoints");
        req.body = serde_json::to_vec(&json!({
            "url": "https://example.com/hook",
            "event": "file.uploaded",
        }))
        .unwrap()
        .into();

        let response = handler.handle(req).await.unwrap();
        assert_eq!(response.status, 201);
        let queries = harness.db.queries();
        assert!(queries[0].sql.starts_with("INSERT INTO endpoints"));
        assert_eq!(queries[0].params[0], json!("https://example.com/hook"));
    }

    #[tokio::test]
    async fn create_endpoint_rejects_empty_fields() {
        let (state, _harness) = state_with_harness().await;
        let handler = CreateEndpointHandler::new(state);

        let mut req = ExtensionRequest::new(Method::POST, "/endpoints");
        req.body = serde_json::to_vec(&json!({ "url": "", "event": "x" }))
            .unwrap()
            .into();

        let err = handler.handle(req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn list_endpoints_returns_rows() {
        let (state, harness) = state_with_harness().await;
        harness
            .db
            .queue_rows(vec![json!({"id": 1, "url": "https://example.com", "event": "e"})]);
        let handler = ListEndpointsHandler::new(state);

        let response = handler
            .handle(ExtensionRequest::new(Method::GET, "/endpoints"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["endpoints"].as_array().unwrap().len(), 1);
    }
}
