//! ExtHub Server — Extension Runtime
//!
//! Main entry point that wires all crates together and starts the server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use exthub_core::config::AppConfig;
use exthub_core::error::AppError;
use exthub_runtime::{ConfigWatcher, DatabasePool, ExtensionRegistry, watcher};

#[tokio::main]
async fn main() {
    let env = std::env::var("EXTHUB_ENV").unwrap_or_else(|_| "default".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ExtHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection ──────────────────────────────
    let pool = if config.database.url.is_empty() {
        tracing::warn!(
            "No database configured; extension schemas, migrations, and persisted audit are off"
        );
        None
    } else {
        tracing::info!("Connecting to database...");
        let db = DatabasePool::connect(&config.database).await?;
        Some(db.pool().clone())
    };

    // ── Step 2: Build the registry and register extensions ───────
    let registry = Arc::new(ExtensionRegistry::new(config.runtime.clone(), pool));
    registry.bootstrap().await?;

    registry
        .register(Arc::new(ext_webhooks::WebhooksExtension::new()))
        .await?;

    // ── Step 3: Persisted extension configuration ────────────────
    watcher::apply_dir(&registry, Path::new(&config.runtime.config_dir)).await;

    if config.runtime.auto_enable {
        registry.enable_all().await;
    }

    // ── Step 4: Hot-reload watcher ───────────────────────────────
    let _config_watcher = ConfigWatcher::spawn(
        Arc::clone(&registry),
        PathBuf::from(&config.runtime.config_dir),
        Duration::from_millis(config.runtime.watch_debounce_ms),
    )?;

    // ── Step 5: Build and start HTTP server ──────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_grace = config.server.shutdown_grace_seconds;

    let state = exthub_api::AppState::new(Arc::new(config), Arc::clone(&registry));
    let app = exthub_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("ExtHub server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 6: Stop extensions ──────────────────────────────────
    let disable_all = async {
        for (meta, _) in registry.list().await {
            if let Err(e) = registry.disable(&meta.name).await {
                tracing::warn!(extension = %meta.name, "Failed to stop extension: {}", e);
            }
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(shutdown_grace), disable_all).await;

    tracing::info!("ExtHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
