//! Extension lifecycle and inspection commands.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use exthub_core::error::AppError;
use exthub_core::types::health::HealthLevel;

/// Row for `exthub list`
#[derive(Debug, Serialize, Tabled)]
struct ExtensionRow {
    name: String,
    version: String,
    state: String,
    description: String,
}

/// Row for `exthub status`
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    name: String,
    state: String,
    initialized: bool,
    last_error: String,
}

/// Row for `exthub metrics`
#[derive(Debug, Serialize, Tabled)]
struct MetricsRow {
    name: String,
    requests: u64,
    errors: u64,
    hooks: u64,
    p50_ms: f64,
    p95_ms: f64,
    db_queries: u64,
}

/// List registered extensions
pub async fn list(env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let rows: Vec<ExtensionRow> = registry
        .list()
        .await
        .into_iter()
        .map(|(meta, status)| ExtensionRow {
            name: meta.name,
            version: meta.version,
            state: status.state.to_string(),
            description: meta.description,
        })
        .collect();

    output::print_list(&rows, format);
    Ok(())
}

/// Show one extension's metadata and status
pub async fn info(env: &str, name: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let meta = registry.metadata(name).await?;
    let status = registry.status(name).await?;

    match format {
        OutputFormat::Table => {
            output::print_kv("Name", &meta.name);
            output::print_kv("Version", &meta.version);
            output::print_kv("Description", &meta.description);
            output::print_kv("Author", &meta.author);
            if !meta.tags.is_empty() {
                output::print_kv("Tags", &meta.tags.join(", "));
            }
            output::print_kv("State", &status.state.to_string());
            if let Some(err) = &status.last_error {
                output::print_kv("Last error", err);
            }
        }
        OutputFormat::Json => {
            output::print_item(
                &serde_json::json!({ "metadata": meta, "status": status }),
                format,
            );
        }
    }
    Ok(())
}

/// Enable an extension
pub async fn enable(env: &str, name: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let status = registry.enable(name).await?;
    output::print_success(&format!("Extension '{}' is {}", name, status.state));
    if let Some(err) = &status.last_error {
        output::print_warning(&format!("Degraded: {}", err));
    }
    Ok(())
}

/// Disable an extension
pub async fn disable(env: &str, name: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let status = registry.disable(name).await?;
    output::print_success(&format!("Extension '{}' is {}", name, status.state));
    Ok(())
}

/// Show lifecycle state of every extension
pub async fn status(env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let rows: Vec<StatusRow> = registry
        .list()
        .await
        .into_iter()
        .map(|(meta, status)| StatusRow {
            name: meta.name,
            state: status.state.to_string(),
            initialized: status.initialized,
            last_error: status.last_error.unwrap_or_default(),
        })
        .collect();

    output::print_list(&rows, format);
    Ok(())
}

/// Probe an extension's health; exits non-zero when unhealthy
pub async fn health(env: &str, name: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let health = registry.health(name).await?;
    output::print_item(&health, format);

    if health.status == HealthLevel::Unhealthy {
        return Err(AppError::lifecycle(format!(
            "extension '{}' is unhealthy: {}",
            name, health.message
        )));
    }
    Ok(())
}

/// Show per-extension runtime metrics
pub async fn metrics(env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    let mut rows = Vec::new();
    for (meta, _) in registry.list().await {
        let snapshot = registry.metrics(&meta.name).await?;
        rows.push(MetricsRow {
            name: meta.name,
            requests: snapshot.request_count,
            errors: snapshot.error_count,
            hooks: snapshot.hooks_executed,
            p50_ms: snapshot.latency_p50_ms,
            p95_ms: snapshot.latency_p95_ms,
            db_queries: snapshot.db_query_count,
        });
    }

    output::print_list(&rows, format);
    Ok(())
}
