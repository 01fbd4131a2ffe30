//! Worker error types.

use thiserror::Error;

use reelcut_media::PipelineError;
use reelcut_models::VideoId;
use reelcut_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Video {id} not found")]
    VideoNotFound { id: VideoId, index: Option<usize> },

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Only transient storage and I/O failures qualify; retry policy itself
    /// belongs to whoever submitted the job.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Storage(e) => !e.is_not_found(),
            WorkerError::Io(_) | WorkerError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::InvalidJob(_) => "invalid_job",
            WorkerError::VideoNotFound { .. } => "video_not_found",
            WorkerError::Timeout(_) => "timeout",
            WorkerError::Cancelled => "cancelled",
            WorkerError::ConfigError(_) => "config_error",
            WorkerError::Pipeline(e) => e.kind(),
            WorkerError::Storage(e) if e.is_not_found() => "not_found",
            WorkerError::Storage(_) => "storage_error",
            WorkerError::Io(_) => "io_error",
        }
    }

    /// Suggested HTTP status for a request surface.
    pub fn status_code(&self) -> u16 {
        match self {
            WorkerError::InvalidJob(_) => 400,
            WorkerError::VideoNotFound { .. } => 404,
            WorkerError::Pipeline(e) => e.status_code(),
            WorkerError::Storage(e) if e.is_not_found() => 404,
            _ => 500,
        }
    }

    /// Index of the input the failure is attributed to, if any.
    pub fn input_index(&self) -> Option<usize> {
        match self {
            WorkerError::VideoNotFound { index, .. } => *index,
            WorkerError::Pipeline(e) => e.input_index(),
            _ => None,
        }
    }

    /// User-facing messages; policy rejections carry one per violation.
    pub fn messages(&self) -> Vec<String> {
        match self {
            WorkerError::Pipeline(PipelineError::Rejected { outcome, .. }) => outcome.messages(),
            other => vec![other.to_string()],
        }
    }
}
