//! Typed edit jobs and their outcomes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use reelcut_models::{JobId, MergeRequest, VideoId, VideoRecord};

use crate::error::WorkerError;

/// Accept an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    #[serde(default)]
    pub job_id: JobId,
    /// Local path of the uploaded file
    pub path: PathBuf,
    pub title: String,
}

/// Trim a stored video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimJob {
    #[serde(default)]
    pub job_id: JobId,
    pub video_id: VideoId,
    /// Seconds; defaults to 0
    #[serde(default)]
    pub start_time: Option<String>,
    /// Seconds; defaults to the video duration
    #[serde(default)]
    pub end_time: Option<String>,
    /// Title of the new video; derived from the source when absent
    #[serde(default)]
    pub title: Option<String>,
}

/// Merge stored videos in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeJob {
    #[serde(default)]
    pub job_id: JobId,
    pub video_ids: Vec<VideoId>,
    #[serde(default)]
    pub title: Option<String>,
}

impl IngestJob {
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            path: path.into(),
            title: title.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("path is required".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        Ok(())
    }
}

impl TrimJob {
    pub fn new(video_id: VideoId) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            start_time: None,
            end_time: None,
            title: None,
        }
    }

    pub fn with_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self.end_time = Some(end.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.video_id.as_str().trim().is_empty() {
            return Err("video_id is required".to_string());
        }
        Ok(())
    }
}

impl MergeJob {
    pub fn new(video_ids: Vec<VideoId>) -> Self {
        Self {
            job_id: JobId::new(),
            video_ids,
            title: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.video_ids.len() < MergeRequest::MIN_SOURCES {
            return Err(format!(
                "At least {} video_ids are required, got {}",
                MergeRequest::MIN_SOURCES,
                self.video_ids.len()
            ));
        }
        if self.video_ids.iter().any(|id| id.as_str().trim().is_empty()) {
            return Err("video_ids must not contain empty ids".to_string());
        }
        Ok(())
    }
}

/// Any job the worker accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditJob {
    Ingest(IngestJob),
    Trim(TrimJob),
    Merge(MergeJob),
}

impl EditJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            EditJob::Ingest(j) => &j.job_id,
            EditJob::Trim(j) => &j.job_id,
            EditJob::Merge(j) => &j.job_id,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            EditJob::Ingest(_) => "ingest",
            EditJob::Trim(_) => "trim",
            EditJob::Merge(_) => "merge",
        }
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        let result = match self {
            EditJob::Ingest(j) => j.validate(),
            EditJob::Trim(j) => j.validate(),
            EditJob::Merge(j) => j.validate(),
        };
        result.map_err(WorkerError::InvalidJob)
    }
}

/// Failure details reported for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_index: Option<usize>,
    pub messages: Vec<String>,
}

impl From<&WorkerError> for JobFailure {
    fn from(err: &WorkerError) -> Self {
        let stage = match err {
            WorkerError::Pipeline(e) => Some(e.stage().to_string()),
            _ => None,
        };
        Self {
            kind: err.kind().to_string(),
            status_code: err.status_code(),
            stage,
            input_index: err.input_index(),
            messages: err.messages(),
        }
    }
}

/// Result line emitted for every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { job_id: JobId, video: VideoRecord },
    Failed { job_id: JobId, error: JobFailure },
}

impl JobOutcome {
    pub fn from_result(job_id: JobId, result: Result<VideoRecord, WorkerError>) -> Self {
        match result {
            Ok(video) => Self::Completed { job_id, video },
            Err(e) => Self::Failed {
                job_id,
                error: JobFailure::from(&e),
            },
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Completed { job_id, .. } | Self::Failed { job_id, .. } => job_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
