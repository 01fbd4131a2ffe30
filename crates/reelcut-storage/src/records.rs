//! Video record stores.
//!
//! The store owns identifiers and upload timestamps: callers hand over a
//! [`NewVideo`] with metadata already computed and get back the persisted
//! [`VideoRecord`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use reelcut_models::{NewVideo, VideoId, VideoRecord};

use crate::error::{StorageError, StorageResult};

/// Persists video metadata.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &VideoId) -> StorageResult<VideoRecord>;

    /// Assign an id and timestamp, then persist.
    async fn insert(&self, video: NewVideo) -> StorageResult<VideoRecord>;
}

/// One JSON document per record in a directory.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    dir: PathBuf,
}

impl JsonRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &VideoId) -> StorageResult<PathBuf> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::invalid_key(id.as_str()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn get(&self, id: &VideoId) -> StorageResult<VideoRecord> {
        let path = self.record_path(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::RecordNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn insert(&self, video: NewVideo) -> StorageResult<VideoRecord> {
        let record = VideoRecord::from_new(VideoId::new(), video, Utc::now());
        let path = self.record_path(&record.id)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(video_id = %record.id, path = %path.display(), "Inserted video record");
        Ok(record)
    }
}

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<VideoId, VideoRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: &VideoId) -> StorageResult<VideoRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound(id.to_string()))
    }

    async fn insert(&self, video: NewVideo) -> StorageResult<VideoRecord> {
        let record = VideoRecord::from_new(VideoId::new(), video, Utc::now());
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str) -> NewVideo {
        NewVideo {
            title: title.to_string(),
            file: "uploads/a.mp4".to_string(),
            size_mb: 6.5,
            duration: 12.0,
            width: 1280,
            height: 720,
            category: None,
            derived_from: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_json_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records"));

        let record = store.insert(video("holiday")).await.unwrap();
        let loaded = store.get(&record.id).await.unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.title, "holiday");
    }

    #[tokio::test]
    async fn test_json_store_missing_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());

        let missing = store.get(&VideoId::from("nope")).await.unwrap_err();
        assert!(missing.is_not_found());

        assert!(matches!(
            store.get(&VideoId::from("../x")).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_assigns_distinct_ids() {
        let store = MemoryRecordStore::new();
        let a = store.insert(video("a")).await.unwrap();
        let b = store.insert(video("b")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(&b.id).await.unwrap().title, "b");
    }
}
