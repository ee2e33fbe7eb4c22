//! CLI command definitions and dispatch.

pub mod config;
pub mod extensions;
pub mod migrate;

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use exthub_core::config::AppConfig;
use exthub_core::error::AppError;
use exthub_runtime::{DatabasePool, ExtensionRegistry, watcher};

/// ExtHub — Extension Runtime
#[derive(Debug, Parser)]
#[command(name = "exthub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (reads config/default + config/<env>)
    #[arg(short, long, default_value = "default")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List registered extensions
    List,
    /// Show an extension's metadata and status
    Info {
        /// Extension name
        name: String,
    },
    /// Enable an extension
    Enable {
        /// Extension name
        name: String,
    },
    /// Disable an extension
    Disable {
        /// Extension name
        name: String,
    },
    /// Show lifecycle state of every extension
    Status,
    /// Probe an extension's health
    Health {
        /// Extension name
        name: String,
    },
    /// Show or apply an extension's configuration
    Config {
        /// Extension name
        name: String,
        /// JSON file to apply; omit to print the current configuration
        file: Option<String>,
    },
    /// Run an extension's pending schema migrations
    Migrate {
        /// Extension name
        name: String,
    },
    /// Roll back one of an extension's applied migrations
    Rollback {
        /// Extension name
        name: String,
        /// Migration version to roll back
        version: i64,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Show per-extension runtime metrics
    Metrics,
    /// Validate an extension manifest file
    Validate {
        /// Path to a manifest JSON file
        path: String,
    },
    /// Generate a skeleton extension crate
    Generate {
        /// Extension name
        name: String,
        /// Output directory
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::List => extensions::list(&self.config, self.format).await,
            Commands::Info { name } => extensions::info(&self.config, name, self.format).await,
            Commands::Enable { name } => extensions::enable(&self.config, name).await,
            Commands::Disable { name } => extensions::disable(&self.config, name).await,
            Commands::Status => extensions::status(&self.config, self.format).await,
            Commands::Health { name } => extensions::health(&self.config, name, self.format).await,
            Commands::Config { name, file } => {
                config::execute(&self.config, name, file.as_deref(), self.format).await
            }
            Commands::Migrate { name } => migrate::run(&self.config, name, self.format).await,
            Commands::Rollback {
                name,
                version,
                force,
            } => migrate::rollback(&self.config, name, *version, *force).await,
            Commands::Metrics => extensions::metrics(&self.config, self.format).await,
            Commands::Validate { path } => config::validate(path).await,
            Commands::Generate { name, output } => {
                config::generate(name, output.as_deref()).await
            }
        }
    }
}

/// Helper: load configuration for the given environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Helper: build a registry with all extensions registered and their
/// persisted configuration applied, mirroring server startup.
pub async fn build_registry(config: &AppConfig) -> Result<Arc<ExtensionRegistry>, AppError> {
    let pool = if config.database.url.is_empty() {
        None
    } else {
        Some(DatabasePool::connect(&config.database).await?.pool().clone())
    };

    let registry = Arc::new(ExtensionRegistry::new(config.runtime.clone(), pool));
    registry.bootstrap().await?;
    registry
        .register(Arc::new(ext_webhooks::WebhooksExtension::new()))
        .await?;
    watcher::apply_dir(&registry, Path::new(&config.runtime.config_dir)).await;

    Ok(registry)
}
