//! Request dispatch into extension namespaces (`/ext/{name}/...`).
//!
//! This is the fault boundary between the host and extension code: quota
//! admission, the auth gate, hook chains, middleware, and the guarded
//! handler call all happen here. A panicking handler becomes a 500 and a
//! fault record; it never unwinds into the host's connection handling.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::FutureExt;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use exthub_core::AppError;
use exthub_core::hooks::{HookContext, HookType};
use exthub_core::types::{AuthRequirement, ExtensionRequest, ExtensionResponse};
use exthub_runtime::hooks::HookDispatchReport;

use crate::auth::auth_from_headers;
use crate::error::{ApiError, ApiErrorResponse};
use crate::state::AppState;

/// Handler for every method under `/ext/{name}/{*path}`.
pub async fn dispatch(
    State(state): State<AppState>,
    Path((name, rest)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match dispatch_inner(state, name, rest, query, method, headers, body).await {
        Ok(response) => response,
        Err(err) => ApiError(err).into_response(),
    }
}

async fn dispatch_inner(
    state: AppState,
    name: String,
    rest: String,
    query: HashMap<String, String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let table = state.registry.dispatch().current().await;
    if !table.is_mounted(&name) {
        // Disabled and failed extensions are simply not mounted.
        return Err(AppError::not_found(format!(
            "extension not found or not running: {name}"
        )));
    }

    let auth = auth_from_headers(&headers);
    let _guard = state
        .registry
        .enforcer()
        .admit_request(&name, auth.as_ref())
        .await?;

    let path = format!("/{}", rest.trim_start_matches('/'));
    let correlation_id = Uuid::new_v4();
    let mut req = ExtensionRequest {
        method: method.clone(),
        path: path.clone(),
        params: HashMap::new(),
        query,
        headers: header_map(&headers),
        body,
        auth: auth.clone(),
        correlation_id,
    };

    let mut ctx = HookContext::new(HookType::PreAuth)
        .with_auth(auth.clone())
        .with_correlation(correlation_id)
        .with_data("extension", Value::String(name.clone()))
        .with_data("path", Value::String(path.clone()))
        .with_data("method", Value::String(method.to_string()));

    let report = state
        .registry
        .pipeline()
        .dispatch(&table, HookType::PreAuth, &mut ctx)
        .await;
    record_hook_faults(&state, report).await;

    let Some((route, params)) = table.match_route(&name, &method, &path) else {
        return Err(AppError::not_found(format!(
            "no route {method} {path} in extension '{name}'"
        )));
    };
    req.params = params;

    match &route.auth {
        AuthRequirement::Public => {}
        AuthRequirement::RequireAuth => {
            if auth.is_none() {
                return Ok(unauthorized());
            }
        }
        AuthRequirement::RequireRole(role) => match &auth {
            None => return Ok(unauthorized()),
            Some(auth) if !auth.has_role(role) => {
                return Err(AppError::permission_denied(format!(
                    "route requires role '{role}'"
                )));
            }
            Some(_) => {}
        },
    }

    ctx.hook = HookType::PostAuth;
    let report = state
        .registry
        .pipeline()
        .dispatch(&table, HookType::PostAuth, &mut ctx)
        .await;
    record_hook_faults(&state, report).await;

    for mounted in table.middleware_for(&name, &path) {
        let result = AssertUnwindSafe(mounted.middleware.before(&mut req))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(None)) => {}
            Ok(Ok(Some(response))) => {
                return Ok(extension_response(response, &ctx));
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                warn!(extension = %name, "Middleware panicked");
                state.registry.record_fault(&name).await;
                return Err(AppError::internal("extension middleware fault"));
            }
        }
    }

    ctx.hook = HookType::PreRequest;
    let report = state
        .registry
        .pipeline()
        .dispatch(&table, HookType::PreRequest, &mut ctx)
        .await;
    record_hook_faults(&state, report).await;

    let handler = route.handler.clone();
    let started = Instant::now();
    let outcome = AssertUnwindSafe(handler.handle(req)).catch_unwind().await;
    let response = match outcome {
        Ok(Ok(response)) => {
            state.registry.metrics_collector().record_request(
                &name,
                started.elapsed(),
                response.status >= 500,
            );
            response
        }
        Ok(Err(err)) => {
            state
                .registry
                .metrics_collector()
                .record_request(&name, started.elapsed(), true);
            return Err(err);
        }
        Err(_) => {
            state
                .registry
                .metrics_collector()
                .record_request(&name, started.elapsed(), true);
            warn!(extension = %name, %method, %path, "Extension handler panicked");
            state.registry.record_fault(&name).await;
            return Err(AppError::internal("extension handler fault"));
        }
    };

    ctx.hook = HookType::PostRequest;
    ctx.data
        .insert("status".to_string(), json!(response.status));
    let report = state
        .registry
        .pipeline()
        .dispatch(&table, HookType::PostRequest, &mut ctx)
        .await;
    record_hook_faults(&state, report).await;

    Ok(extension_response(response, &ctx))
}

async fn record_hook_faults(state: &AppState, report: HookDispatchReport) {
    for module in report.faulted {
        state.registry.record_fault(&module).await;
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: "authentication required".to_string(),
        }),
    )
        .into_response()
}

/// Convert an extension response, applying response headers accumulated in
/// the hook context.
fn extension_response(response: ExtensionResponse, ctx: &HookContext) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = (status, Json(response.body)).into_response();
    let headers = out.headers_mut();
    for (name, value) in response.headers.iter().chain(&ctx.response_headers) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            headers.insert(name, value);
        }
    }
    out
}
