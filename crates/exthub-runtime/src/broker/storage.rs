//! Prefix-scoped blob storage on the local filesystem.
//!
//! Each extension gets its own directory under the host storage root. Keys
//! are validated so an extension cannot escape its prefix, and writes are
//! metered against the disk quota.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::traits::ScopedStorage;

use crate::security::SecurityEnforcer;

/// Filesystem-backed [`ScopedStorage`] rooted at the extension's directory.
pub struct FsScopedStorage {
    root: PathBuf,
    module: String,
    enforcer: Arc<SecurityEnforcer>,
}

impl FsScopedStorage {
    pub fn new(root: PathBuf, module: String, enforcer: Arc<SecurityEnforcer>) -> Self {
        Self {
            root,
            module,
            enforcer,
        }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(AppError::validation(format!(
                "invalid storage key '{key}'"
            )));
        }
        Ok(self.root.join(key))
    }

    async fn existing_len(path: &Path) -> u64 {
        tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ScopedStorage for FsScopedStorage {
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.enforcer
            .check(&self.module, "storage", "write", None)
            .await?;
        let path = self.resolve(key)?;

        let previous = Self::existing_len(&path).await;
        let new_len = data.len() as u64;
        if new_len > previous {
            self.enforcer
                .reserve_disk(&self.module, new_len - previous)
                .await?;
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Err(err) = tokio::fs::write(&path, &data).await {
            if new_len > previous {
                self.enforcer.release_disk(&self.module, new_len - previous);
            }
            return Err(err.into());
        }
        if previous > new_len {
            self.enforcer.release_disk(&self.module, previous - new_len);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<Bytes>> {
        self.enforcer
            .check(&self.module, "storage", "read", None)
            .await?;
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.enforcer
            .check(&self.module, "storage", "write", None)
            .await?;
        let path = self.resolve(key)?;
        let len = Self::existing_len(&path).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                self.enforcer.release_disk(&self.module, len);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> AppResult<Vec<String>> {
        self.enforcer
            .check(&self.module, "storage", "read", None)
            .await?;

        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root) {
                    keys.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::MemoryAuditSink;
    use exthub_core::types::{Permission, Quota};

    async fn storage(dir: &Path) -> FsScopedStorage {
        let enforcer = Arc::new(SecurityEnforcer::new(
            Quota::default(),
            Arc::new(MemoryAuditSink::default()),
        ));
        enforcer
            .register_extension(
                "files",
                vec![Permission {
                    name: "files.storage".to_string(),
                    description: String::new(),
                    resource: "storage".to_string(),
                    actions: vec!["read".to_string(), "write".to_string()],
                }],
                None,
                vec![],
            )
            .await;
        FsScopedStorage::new(dir.to_path_buf(), "files".to_string(), enforcer)
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .put("reports/latest.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        let data = storage.get("reports/latest.json").await.unwrap();
        assert_eq!(data, Some(Bytes::from_static(b"{}")));
        assert_eq!(storage.list().await.unwrap(), vec!["reports/latest.json"]);

        storage.delete("reports/latest.json").await.unwrap();
        assert_eq!(storage.get("reports/latest.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path()).await;

        for key in ["../escape", "/absolute", "a//b", ""] {
            let err = storage.put(key, Bytes::new()).await.unwrap_err();
            assert_eq!(err.kind, exthub_core::error::ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn missing_permission_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let enforcer = Arc::new(SecurityEnforcer::new(
            Quota::default(),
            Arc::new(MemoryAuditSink::default()),
        ));
        enforcer.register_extension("bare", vec![], None, vec![]).await;
        let storage = FsScopedStorage::new(dir.path().to_path_buf(), "bare".to_string(), enforcer);

        let err = storage.get("anything").await.unwrap_err();
        assert_eq!(err.kind, exthub_core::error::ErrorKind::PermissionDenied);
    }
}
