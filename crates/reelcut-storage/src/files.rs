//! File storage: storage keys to local paths and back.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::move_file;

/// Directory (under the storage root) that accepted uploads are moved into.
pub const UPLOADS_PREFIX: &str = "uploads";

/// Maps durable storage keys to local readable paths.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Local readable path for a key.
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf>;

    /// Make a local file durable and return its key.
    async fn store(&self, local: &Path) -> StorageResult<String>;
}

/// [`FileStorage`] on a local directory.
///
/// Files already under the root are stored in place; anything else is moved
/// into `{root}/uploads/` under a unique name.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Option<_>>()?;
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

/// Reject keys that could escape the storage root.
fn validate_key(key: &str) -> StorageResult<()> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(StorageError::invalid_key(key))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let path = self.root.join(key);
        if !tokio::fs::try_exists(&path).await? {
            return Err(StorageError::not_found(key));
        }
        Ok(path)
    }

    async fn store(&self, local: &Path) -> StorageResult<String> {
        if !tokio::fs::try_exists(local).await? {
            return Err(StorageError::not_found(local.display().to_string()));
        }

        if let Some(key) = self.key_for(local) {
            debug!(key = %key, "File already in storage root");
            return Ok(key);
        }

        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::store_failed(format!("{} has no file name", local.display())))?;
        let key = format!("{}/{}_{}", UPLOADS_PREFIX, Uuid::new_v4().simple(), name);
        move_file(local, self.root.join(&key)).await?;
        debug!(key = %key, "Stored upload");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_in_place_for_files_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let artifact = dir.path().join("trimmed").join("trimmed_x_a.mp4");
        tokio::fs::create_dir_all(artifact.parent().unwrap()).await.unwrap();
        tokio::fs::write(&artifact, b"x").await.unwrap();

        let key = storage.store(&artifact).await.unwrap();
        assert_eq!(key, "trimmed/trimmed_x_a.mp4");
        assert_eq!(storage.resolve(&key).await.unwrap(), artifact);
    }

    #[tokio::test]
    async fn test_store_moves_outside_files() {
        let root = tempfile::tempdir().unwrap();
        let incoming = tempfile::tempdir().unwrap();
        let upload = incoming.path().join("clip.mp4");
        tokio::fs::write(&upload, b"x").await.unwrap();

        let storage = LocalFileStorage::new(root.path());
        let key = storage.store(&upload).await.unwrap();

        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("_clip.mp4"));
        assert!(!upload.exists());
        assert!(storage.resolve(&key).await.unwrap().exists());
    }

    #[tokio::test]
    async fn test_resolve_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert!(matches!(
            storage.resolve("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.resolve("/etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.resolve("uploads/missing.mp4").await.unwrap_err().is_not_found());
    }
}
