//! Extension schema migration commands.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use exthub_core::error::AppError;

/// Row for `exthub migrate` status output
#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    version: i64,
    description: String,
    status: String,
    updated_at: String,
}

/// Run an extension's pending migrations and print the resulting ledger
pub async fn run(env: &str, name: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    println!("Running migrations for '{}'...", name);
    let applied = registry.migrate(name).await?;
    output::print_success(&format!("{} migration(s) applied.", applied));

    let rows: Vec<MigrationRow> = registry
        .migration_status(name)
        .await?
        .into_iter()
        .map(|record| MigrationRow {
            version: record.version,
            description: record.description,
            status: record.status.to_string(),
            updated_at: record.updated_at.to_rfc3339(),
        })
        .collect();
    output::print_list(&rows, format);

    Ok(())
}

/// Roll back one applied migration, confirming first unless forced
pub async fn rollback(env: &str, name: &str, version: i64, force: bool) -> Result<(), AppError> {
    if !force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!(
                "This will roll back migration v{} of '{}' and may destroy data. Continue?",
                version, name
            ))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    registry.rollback(name, version).await?;
    output::print_success(&format!("Rolled back '{}' migration v{}.", name, version));
    Ok(())
}
