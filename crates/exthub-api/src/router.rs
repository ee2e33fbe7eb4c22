//! Route definitions for the ExtHub HTTP surface.
//!
//! Management routes live under `/api`; extension traffic is funneled
//! through the single dispatch handler under `/ext/{name}/...`.

use axum::{
    Router,
    routing::{any, get, post},
};
use tower_http::cors::{AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatch;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(extension_routes())
        .route("/health", get(handlers::health::health));

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .route("/ext/{name}/{*rest}", any(dispatch::dispatch))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Extension management endpoints.
fn extension_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/extensions", get(handlers::extensions::list))
        .route("/v1/extensions/{name}", get(handlers::extensions::info))
        .route(
            "/v1/extensions/{name}/enable",
            post(handlers::extensions::enable),
        )
        .route(
            "/v1/extensions/{name}/disable",
            post(handlers::extensions::disable),
        )
        .route(
            "/v1/extensions/{name}/status",
            get(handlers::extensions::status),
        )
        .route(
            "/v1/extensions/{name}/health",
            get(handlers::extensions::health),
        )
        .route(
            "/v1/extensions/{name}/metrics",
            get(handlers::extensions::metrics),
        )
        .route(
            "/v1/extensions/{name}/config",
            get(handlers::extensions::get_config).put(handlers::extensions::put_config),
        )
        .route(
            "/v1/extensions/{name}/config/schema",
            get(handlers::extensions::get_config_schema),
        )
        .route(
            "/v1/extensions/{name}/migrate",
            post(handlers::extensions::migrate),
        )
        .route(
            "/v1/extensions/{name}/rollback",
            post(handlers::extensions::rollback),
        )
        .route(
            "/v1/extensions/{name}/migrations",
            get(handlers::extensions::migrations),
        )
        .route(
            "/v1/extensions/{name}/audit",
            get(handlers::extensions::audit),
        )
}

/// CORS policy from configuration; `*` in the allowed origins opens the
/// surface up entirely.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let cors_config = &state.config.server.cors;

    let origins = if cors_config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok()),
        )
    };
    let methods = if cors_config.allowed_methods.iter().any(|m| m == "*") {
        AllowMethods::any()
    } else {
        AllowMethods::list(
            cors_config
                .allowed_methods
                .iter()
                .filter_map(|method| method.parse().ok()),
        )
    };

    CorsLayer::new().allow_origin(origins).allow_methods(methods)
}
