//! Extension management endpoints under `/api/v1/extensions`.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

use exthub_core::types::{AuditEntry, ConfigSchema, ExtensionStatus, HealthLevel, HealthStatus};

use crate::auth::{auth_from_headers, require_admin};
use crate::dto::{
    ApiResponse, AuditQuery, ExtensionInfo, MetricsResponse, MigrationsResponse, RollbackRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/extensions
pub async fn list(State(state): State<AppState>) -> Json<ApiResponse<Vec<ExtensionInfo>>> {
    let extensions = state
        .registry
        .list()
        .await
        .into_iter()
        .map(|(meta, status)| ExtensionInfo::from_parts(meta, status))
        .collect();
    Json(ApiResponse::ok(extensions))
}

/// GET /api/v1/extensions/{name}
pub async fn info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ExtensionInfo>>, ApiError> {
    let meta = state.registry.metadata(&name).await?;
    let status = state.registry.status(&name).await?;
    Ok(Json(ApiResponse::ok(ExtensionInfo::from_parts(
        meta, status,
    ))))
}

/// POST /api/v1/extensions/{name}/enable
pub async fn enable(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ExtensionStatus>>, ApiError> {
    require_admin(&auth_from_headers(&headers))?;
    let status = state.registry.enable(&name).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/v1/extensions/{name}/disable
pub async fn disable(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ExtensionStatus>>, ApiError> {
    require_admin(&auth_from_headers(&headers))?;
    let status = state.registry.disable(&name).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// GET /api/v1/extensions/{name}/status
pub async fn status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ExtensionStatus>>, ApiError> {
    let status = state.registry.status(&name).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// GET /api/v1/extensions/{name}/health
///
/// The body always carries the probed status; anything other than healthy
/// answers 503 so load balancers and uptime checks fail without parsing it.
pub async fn health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<HealthStatus>), ApiError> {
    let health = state.registry.health(&name).await?;
    let code = match health.status {
        HealthLevel::Healthy => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    Ok((code, Json(health)))
}

/// GET /api/v1/extensions/{name}/metrics
pub async fn metrics(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<MetricsResponse>>, ApiError> {
    let metrics = state.registry.metrics(&name).await?;
    Ok(Json(ApiResponse::ok(MetricsResponse { name, metrics })))
}

/// GET /api/v1/extensions/{name}/config
pub async fn get_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let config = state.registry.current_config(&name).await?;
    Ok(Json(ApiResponse::ok(config)))
}

/// GET /api/v1/extensions/{name}/config/schema
pub async fn get_config_schema(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ConfigSchema>>, ApiError> {
    let schema = state.registry.config_schema(&name).await?;
    Ok(Json(ApiResponse::ok(schema)))
}

/// PUT /api/v1/extensions/{name}/config
///
/// The document is validated against the extension's declared schema; on
/// any violation the previous configuration stays in force.
pub async fn put_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(document): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    require_admin(&auth_from_headers(&headers))?;
    state.registry.apply_config(&name, document).await?;
    let config = state.registry.current_config(&name).await?;
    Ok(Json(ApiResponse::ok(config)))
}

/// POST /api/v1/extensions/{name}/migrate
pub async fn migrate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MigrationsResponse>>, ApiError> {
    require_admin(&auth_from_headers(&headers))?;
    state.registry.migrate(&name).await?;
    let migrations = state.registry.migration_status(&name).await?;
    Ok(Json(ApiResponse::ok(MigrationsResponse { name, migrations })))
}

/// POST /api/v1/extensions/{name}/rollback
pub async fn rollback(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RollbackRequest>,
) -> Result<Json<ApiResponse<MigrationsResponse>>, ApiError> {
    require_admin(&auth_from_headers(&headers))?;
    state.registry.rollback(&name, request.version).await?;
    let migrations = state.registry.migration_status(&name).await?;
    Ok(Json(ApiResponse::ok(MigrationsResponse { name, migrations })))
}

/// GET /api/v1/extensions/{name}/migrations
pub async fn migrations(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<MigrationsResponse>>, ApiError> {
    let migrations = state.registry.migration_status(&name).await?;
    Ok(Json(ApiResponse::ok(MigrationsResponse { name, migrations })))
}

/// GET /api/v1/extensions/{name}/audit
pub async fn audit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<AuditQuery>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<AuditEntry>>>, ApiError> {
    require_admin(&auth_from_headers(&headers))?;
    let entries = state.registry.audit(&name, query.limit).await?;
    Ok(Json(ApiResponse::ok(entries)))
}
