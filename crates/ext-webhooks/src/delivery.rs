//! Post-request delivery hook.
//!
//! Fires after every host request and posts a notification to the
//! configured URL. Delivery runs on its own task so the request path never
//! waits on the remote endpoint.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use exthub_sdk::prelude::*;

use crate::extension::WebhooksState;

pub struct DeliveryHook {
    state: Arc<WebhooksState>,
}

impl DeliveryHook {
    pub fn new(state: Arc<WebhooksState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl HookCallback for DeliveryHook {
    async fn call(&self, ctx: &mut HookContext) -> AppResult<HookOutcome> {
        let config = self.state.config();
        if config.delivery_url.is_empty() {
            return Ok(HookOutcome::Continue);
        }

        let payload = json!({
            "event": "request.completed",
            "extension": ctx.get_str("extension"),
            "path": ctx.get_str("path"),
            "status": ctx.get("status"),
            "correlation_id": ctx.correlation_id,
            "timestamp": ctx.timestamp,
        });

        let client = self.state.client();
        let services = self.state.services().ok();
        tokio::spawn(async move {
            let mut last_status = None;
            for attempt in 1..=config.retry_limit.max(1) {
                match client
                    .post(&config.delivery_url)
                    .json(&payload)
                    .send()
                    .await
                {
                    Ok(response) if response.status().is_success() => {
                        last_status = Some(response.status().as_u16());
                        debug!(url = %config.delivery_url, attempt, "Webhook delivered");
                        break;
                    }
                    Ok(response) => {
                        last_status = Some(response.status().as_u16());
                        warn!(
                            url = %config.delivery_url,
                            status = response.status().as_u16(),
                            attempt,
                            "Webhook delivery rejected"
                        );
                    }
                    Err(err) => {
                        warn!(url = %config.delivery_url, attempt, error = %err, "Webhook delivery failed");
                    }
                }
            }

            if let Some(services) = services {
                let result = services
                    .db
                    .execute(
                        "INSERT INTO deliveries (status_code) VALUES ($1)",
                        vec![json!(last_status)],
                    )
                    .await;
                if let Err(err) = result {
                    services
                        .logger
                        .warn(&format!("failed to record delivery: {err}"));
                }
            }
        });

        Ok(HookOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::WebhooksExtension;
    use exthub_sdk::harness::TestHarness;

    #[tokio::test]
    async fn hook_is_a_no_op_without_delivery_url() {
        let ext = WebhooksExtension::new();
        let harness = TestHarness::new("webhooks");
        harness.initialize(&ext).await.unwrap();

        let hook = DeliveryHook::new(ext.state());
        let mut ctx = HookContext::new(HookType::PostRequest);
        let outcome = hook.call(&mut ctx).await.unwrap();

        assert_eq!(outcome, HookOutcome::Continue);
        assert!(harness.db.queries().is_empty());
    }
}
