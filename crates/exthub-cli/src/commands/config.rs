//! Extension configuration, manifest validation, and scaffolding commands.

use std::path::Path;

use crate::output::{self, OutputFormat};
use exthub_core::error::AppError;
use exthub_core::types::metadata::ExtensionMetadata;

/// Show or apply an extension's configuration
pub async fn execute(
    env: &str,
    name: &str,
    file: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let registry = super::build_registry(&config).await?;

    match file {
        None => {
            let current = registry.current_config(name).await?;
            output::print_item(&current, format);
        }
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::configuration(format!("Failed to read '{path}': {e}")))?;
            let document: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| AppError::configuration(format!("'{path}' is not valid JSON: {e}")))?;

            registry.apply_config(name, document).await?;
            output::print_success(&format!("Configuration applied to '{}'", name));
        }
    }
    Ok(())
}

/// Validate an extension manifest file; exits non-zero when invalid
pub async fn validate(path: &str) -> Result<(), AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::configuration(format!("Failed to read '{path}': {e}")))?;
    let metadata: ExtensionMetadata = serde_json::from_str(&raw)
        .map_err(|e| AppError::validation(format!("'{path}' is not a valid manifest: {e}")))?;

    match metadata.validate() {
        Ok(()) => {
            output::print_success(&format!("Manifest '{}' is valid", path));
            output::print_kv("Name", &metadata.name);
            output::print_kv("Version", &metadata.version);
            output::print_kv("Mount prefix", &metadata.mount_prefix());
            output::print_kv("Schema", &metadata.schema_name());
            Ok(())
        }
        Err(e) => {
            output::print_error(&format!("Manifest invalid: {}", e));
            Err(e)
        }
    }
}

const CARGO_TEMPLATE: &str = r#"[package]
name = "ext-__NAME__"
version = "0.1.0"
edition = "2024"

[dependencies]
exthub-core = { path = "../crates/exthub-core" }
exthub-sdk = { path = "../crates/exthub-sdk" }

async-trait = "0.1"
serde_json = "1"

[dev-dependencies]
tokio = { version = "1", features = ["macros", "rt-multi-thread"] }
"#;

const LIB_TEMPLATE: &str = r#"//! The __NAME__ extension.

use exthub_sdk::extension_metadata;
use exthub_sdk::prelude::*;

pub struct __TYPE__Extension;

#[async_trait]
impl Extension for __TYPE__Extension {
    fn metadata(&self) -> ExtensionMetadata {
        extension_metadata!(
            name: "__NAME__",
            version: "0.1.0",
            description: "TODO",
            author: "TODO"
        )
    }

    async fn initialize(&self, services: ServiceScope) -> AppResult<()> {
        services.logger.info("__NAME__ extension initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_valid() {
        assert!(__TYPE__Extension.metadata().validate().is_ok());
    }
}
"#;

/// Generate a skeleton extension crate
pub async fn generate(name: &str, output_dir: Option<&str>) -> Result<(), AppError> {
    // Validates the name shape before writing anything.
    let meta = ExtensionMetadata {
        name: name.to_string(),
        version: "0.1.0".to_string(),
        author: "unknown".to_string(),
        ..Default::default()
    };
    meta.validate()?;

    let dir = output_dir
        .map(str::to_string)
        .unwrap_or_else(|| format!("ext-{name}"));
    let root = Path::new(&dir);
    if root.exists() {
        return Err(AppError::validation(format!(
            "output directory '{dir}' already exists"
        )));
    }

    let type_name = camel_case(name);
    let cargo = CARGO_TEMPLATE.replace("__NAME__", name);
    let lib = LIB_TEMPLATE
        .replace("__TYPE__", &type_name)
        .replace("__NAME__", name);

    tokio::fs::create_dir_all(root.join("src"))
        .await
        .map_err(|e| AppError::internal(format!("Failed to create '{dir}': {e}")))?;
    tokio::fs::write(root.join("Cargo.toml"), cargo)
        .await
        .map_err(|e| AppError::internal(format!("Failed to write Cargo.toml: {e}")))?;
    tokio::fs::write(root.join("src/lib.rs"), lib)
        .await
        .map_err(|e| AppError::internal(format!("Failed to write lib.rs: {e}")))?;

    output::print_success(&format!("Extension skeleton written to '{}'", dir));
    println!("  Add it to the workspace and register it at host startup.");
    Ok(())
}

/// "audit-log" → "AuditLog"
fn camel_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_joins_segments() {
        assert_eq!(camel_case("webhooks"), "Webhooks");
        assert_eq!(camel_case("audit-log"), "AuditLog");
        assert_eq!(camel_case("a_b-c"), "ABC");
    }
}
