//! Hot-reload watcher for per-extension configuration files.
//!
//! Watches `<config_dir>/<name>.json`. Changes are debounced, validated
//! against the extension's declared schema, and applied through the
//! registry; an invalid document leaves the previous configuration in force
//! and is reported in the log.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use exthub_core::AppResult;
use exthub_core::error::{AppError, ErrorKind};

use crate::registry::ExtensionRegistry;

/// Watches a configuration directory and applies file changes to the
/// registry until dropped.
pub struct ConfigWatcher {
    // Held to keep the OS watch alive.
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `dir`, creating it if missing.
    pub fn spawn(
        registry: Arc<ExtensionRegistry>,
        dir: PathBuf,
        debounce: Duration,
    ) -> AppResult<Self> {
        std::fs::create_dir_all(&dir)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Err(err) => warn!(error = %err, "Configuration watch error"),
            },
        )
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Failed to create configuration watcher: {e}"),
                e,
            )
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to watch {}: {e}", dir.display()),
                    e,
                )
            })?;
        info!(dir = %dir.display(), "Watching extension configuration");

        let task = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                tokio::time::sleep(debounce).await;
                let mut paths = vec![first];
                while let Ok(path) = rx.try_recv() {
                    paths.push(path);
                }
                paths.sort();
                paths.dedup();
                for path in paths {
                    apply_file(&registry, &path).await;
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Apply every `<name>.json` in `dir` once. Used at startup so extensions
/// come up with their persisted configuration.
pub async fn apply_dir(registry: &ExtensionRegistry, dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    paths.sort();
    for path in paths {
        apply_file(registry, &path).await;
    }
}

async fn apply_file(registry: &ExtensionRegistry, path: &Path) {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return;
    }
    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        // Deletes and renames surface as change events too.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
        Err(err) => {
            warn!(extension = %name, error = %err, "Failed to read configuration file");
            return;
        }
    };
    let document = match serde_json::from_str(&raw) {
        Ok(document) => document,
        Err(err) => {
            warn!(
                extension = %name,
                error = %err,
                "Configuration file is not valid JSON; previous configuration kept"
            );
            return;
        }
    };

    match registry.apply_config(name, document).await {
        Ok(()) => debug!(extension = %name, "Configuration reloaded"),
        Err(err) => warn!(
            extension = %name,
            error = %err,
            "Configuration rejected; previous configuration kept"
        ),
    }
}
