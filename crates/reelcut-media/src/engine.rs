//! Transform engines behind a common trait.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::watch;

use reelcut_models::{EncodingConfig, MergeRequest, TrimRequest};

use crate::command::FfmpegRunner;
use crate::error::ProcessingError;
use crate::merge::MergeEngine;
use crate::progress::{FfmpegProgress, ProgressCallback};
use crate::trim::TrimEngine;

/// Per-run controls supplied by the caller.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Raising this signal stops the encoder
    pub cancel: Option<watch::Receiver<bool>>,
    /// Receives encoder progress
    pub progress: Option<ProgressCallback>,
    /// Hard limit on one encoder run, in seconds
    pub timeout_secs: Option<u64>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub(crate) fn runner(&self) -> FfmpegRunner {
        let runner = FfmpegRunner::new().with_optional_cancel(self.cancel.clone());
        match self.timeout_secs {
            Some(secs) => runner.with_timeout(secs),
            None => runner,
        }
    }

    pub(crate) fn progress_sink(&self) -> impl Fn(FfmpegProgress) + Send + 'static {
        let callback = self.progress.clone();
        move |progress| {
            if let Some(callback) = &callback {
                callback(progress);
            }
        }
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("cancel", &self.cancel.is_some())
            .field("progress", &self.progress.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Encodes trim and merge outputs to a given path.
///
/// Engines write exactly one file, `output`, and release every source handle
/// before returning, whatever the outcome.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn trim(
        &self,
        request: &TrimRequest,
        output: &Path,
        options: &RunOptions,
    ) -> Result<(), ProcessingError>;

    async fn merge(
        &self,
        request: &MergeRequest,
        output: &Path,
        options: &RunOptions,
    ) -> Result<(), ProcessingError>;
}

/// [`MediaEngine`] that shells out to FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    trim: TrimEngine,
    merge: MergeEngine,
}

impl FfmpegEngine {
    /// Both engines share one canonical encoding.
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            trim: TrimEngine::new(encoding.clone()),
            merge: MergeEngine::new(encoding),
        }
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn trim(
        &self,
        request: &TrimRequest,
        output: &Path,
        options: &RunOptions,
    ) -> Result<(), ProcessingError> {
        self.trim.trim(request, output, options).await
    }

    async fn merge(
        &self,
        request: &MergeRequest,
        output: &Path,
        options: &RunOptions,
    ) -> Result<(), ProcessingError> {
        self.merge.merge(request, output, options).await
    }
}
