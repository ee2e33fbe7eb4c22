//! Host health endpoint.

use axum::Json;
use axum::extract::State;

use crate::dto::{ApiResponse, ExtensionHealthEntry, HostHealthResponse};
use crate::state::AppState;

/// GET /api/health
///
/// The host always answers, even when every extension is failed; extension
/// failure is data here, not an error.
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HostHealthResponse>> {
    let mut extensions = Vec::new();
    for (meta, _) in state.registry.list().await {
        if let Ok(health) = state.registry.health(&meta.name).await {
            extensions.push(ExtensionHealthEntry {
                name: meta.name,
                health,
            });
        }
    }

    Json(ApiResponse::ok(HostHealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        extensions,
    }))
}
