//! In-process fakes for worker tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reelcut_media::{
    MediaEngine, MediaPipeline, MediaProbe, PipelineConfig, ProbeError, ProcessingError, RunOptions,
};
use reelcut_models::{MergeRequest, SourceMedia, TrimRequest, VideoRecord};
use reelcut_storage::{LocalFileStorage, MemoryRecordStore};

use crate::error::WorkerError;
use crate::processor::EditProcessor;

/// Describes files written as "size_mb,duration,width,height".
pub struct FakeProbe;

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, path: &Path) -> Result<SourceMedia, ProbeError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| ProbeError::NotFound {
                path: path.to_path_buf(),
            })?;
        let v: Vec<f64> = contents.split(',').filter_map(|p| p.parse().ok()).collect();
        if v.len() != 4 {
            return Err(ProbeError::unreadable(path, "not media"));
        }
        Ok(SourceMedia {
            path: path.to_path_buf(),
            size: (v[0] * 1024.0 * 1024.0) as u64,
            duration: v[1],
            width: v[2] as u32,
            height: v[3] as u32,
            fps: 30.0,
            has_audio: true,
        })
    }
}

/// Writes a describable output, optionally after a delay that honours
/// cancellation.
pub struct FakeEngine {
    pub delay: Option<Duration>,
}

impl FakeEngine {
    async fn write(&self, output: &Path, duration: f64, source: &SourceMedia, options: &RunOptions) -> Result<(), ProcessingError> {
        if let Some(delay) = self.delay {
            let mut cancel = options.cancel.clone();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = async {
                    match cancel.as_mut() {
                        Some(rx) => { let _ = rx.wait_for(|c| *c).await; }
                        None => std::future::pending::<()>().await,
                    }
                } => return Err(ProcessingError::Cancelled),
            }
        }
        tokio::fs::write(
            output,
            format!("6,{},{},{}", duration, source.width, source.height),
        )
        .await
        .map_err(|e| ProcessingError::encode_failed(e.to_string()))
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn trim(&self, r: &TrimRequest, output: &Path, options: &RunOptions) -> Result<(), ProcessingError> {
        self.write(output, r.range.duration(), &r.source, options).await
    }

    async fn merge(&self, r: &MergeRequest, output: &Path, options: &RunOptions) -> Result<(), ProcessingError> {
        self.write(output, r.total_duration(), &r.sources[0], options).await
    }
}

/// A processor over fakes with its media root and an upload inbox.
pub struct Harness {
    pub processor: EditProcessor,
    pub root: tempfile::TempDir,
    pub incoming: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_delay(None)
    }

    pub fn with_delay(delay: Option<Duration>) -> Self {
        let root = tempfile::tempdir().unwrap();
        let pipeline = MediaPipeline::with_components(
            PipelineConfig::new(root.path()),
            Arc::new(FakeProbe),
            Arc::new(FakeEngine { delay }),
        );
        let processor = EditProcessor::new(
            pipeline,
            Arc::new(LocalFileStorage::new(root.path())),
            Arc::new(MemoryRecordStore::new()),
        );
        Self {
            processor,
            root,
            incoming: tempfile::tempdir().unwrap(),
        }
    }

    pub async fn upload(&self, name: &str, size_mb: f64, duration: f64) -> Result<VideoRecord, WorkerError> {
        let path = self.incoming.path().join(name);
        tokio::fs::write(&path, format!("{},{},640,360", size_mb, duration))
            .await
            .unwrap();
        self.processor.ingest_upload(&path, name).await
    }
}
