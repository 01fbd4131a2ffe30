//! Error types for media operations.
//!
//! Two layers: [`MediaError`] describes what went wrong with the external
//! tools (FFmpeg/FFprobe), while [`ProbeError`], [`RangeError`] and
//! [`ProcessingError`] describe what that means for the clip being worked on.
//! [`PipelineError`] carries one of those plus the stage it happened in.

use std::path::{Path, PathBuf};
use thiserror::Error;

use reelcut_models::ValidationOutcome;

use crate::pipeline::PipelineStage;

/// Result type for media tool operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors raised while running the external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Captured stderr of the failed tool, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::FfmpegFailed { stderr, .. } | Self::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

/// Errors raised while probing a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Media file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Not a decodable media container.
    #[error("Unreadable media file {}: {detail}", .path.display())]
    Unreadable { path: PathBuf, detail: String },

    /// The container opened but its metadata could not be extracted.
    #[error("Corrupt media metadata in {}: {detail}", .path.display())]
    Corrupt { path: PathBuf, detail: String },

    #[error(transparent)]
    Tool(#[from] MediaError),
}

impl ProbeError {
    pub fn unreadable(path: &Path, detail: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    pub fn corrupt(path: &Path, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}

/// Which semantic range check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeViolation {
    /// `start < 0`
    NegativeStart,
    /// `end <= start`
    Empty,
    /// `end > duration`
    PastEnd,
}

impl std::fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeStart => write!(f, "start time cannot be negative"),
            Self::Empty => write!(f, "end time must be after start time"),
            Self::PastEnd => write!(f, "end time exceeds video duration"),
        }
    }
}

/// Errors raised while resolving a trim window.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("Invalid {field} value: {raw:?} is not a number")]
    Malformed { field: &'static str, raw: String },

    #[error("Invalid time range [{start}, {end}) for {duration}s video: {reason}")]
    Invalid {
        start: f64,
        end: f64,
        duration: f64,
        reason: RangeViolation,
    },
}

/// Errors raised by the trim and merge engines and the artifact writer.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// A source stream could not be read at the requested offsets.
    #[error("Decoding failed{}: {detail}", fmt_index(.input_index))]
    DecodeFailed {
        input_index: Option<usize>,
        detail: String,
    },

    /// Output writing failed (disk full, encoder rejection, ...).
    #[error("Encoding failed: {detail}")]
    EncodeFailed { detail: String },

    #[error("At least 2 inputs are required, got {given}")]
    InsufficientInputs { given: usize },

    #[error("Source {input_index} not found: {}", .path.display())]
    SourceNotFound { input_index: usize, path: PathBuf },

    #[error("Processing cancelled")]
    Cancelled,
}

fn fmt_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" for input {}", i)).unwrap_or_default()
}

impl ProcessingError {
    pub fn decode_failed(input_index: Option<usize>, detail: impl Into<String>) -> Self {
        Self::DecodeFailed {
            input_index,
            detail: detail.into(),
        }
    }

    pub fn encode_failed(detail: impl Into<String>) -> Self {
        Self::EncodeFailed {
            detail: detail.into(),
        }
    }

    /// Translate a tool failure into a processing failure.
    ///
    /// FFmpeg's stderr decides between decode and encode failures: a line
    /// starting with `<input path>:` blames that input, and
    /// generic decoder complaints blame an unknown input. Everything else is
    /// an output-side failure.
    pub fn from_media(err: MediaError, inputs: &[&Path], output: &Path) -> Self {
        match err {
            MediaError::Cancelled | MediaError::Timeout(_) => Self::Cancelled,
            MediaError::FileNotFound(path) => {
                let input_index = inputs.iter().position(|p| *p == path.as_path()).unwrap_or(0);
                Self::SourceNotFound { input_index, path }
            }
            MediaError::FfmpegFailed {
                message, stderr, ..
            } => {
                let stderr = stderr.unwrap_or_default();
                classify_stderr(&stderr, inputs, output)
                    .unwrap_or_else(|| Self::encode_failed(summarize(&message, &stderr)))
            }
            other => Self::encode_failed(other.to_string()),
        }
    }
}

const DECODE_MARKERS: &[&str] = &[
    "Invalid data found when processing input",
    "moov atom not found",
    "Error while decoding",
    "could not find codec parameters",
    "Error opening input",
    "End of file",
];

fn classify_stderr(stderr: &str, inputs: &[&Path], output: &Path) -> Option<ProcessingError> {
    let output = output.to_string_lossy();
    let prefixes: Vec<String> = inputs
        .iter()
        .map(|input| format!("{}:", input.to_string_lossy()))
        .collect();

    for line in stderr.lines() {
        let line = line.trim_start();
        if line.contains(output.as_ref()) {
            continue;
        }
        // FFmpeg prefixes per-input errors with the path exactly as given
        if let Some(index) = prefixes.iter().position(|prefix| line.starts_with(prefix.as_str())) {
            return Some(ProcessingError::decode_failed(Some(index), line.trim()));
        }
    }

    stderr
        .lines()
        .find(|line| DECODE_MARKERS.iter().any(|m| line.contains(m)))
        .map(|line| ProcessingError::decode_failed(None, line.trim()))
}

fn summarize(message: &str, stderr: &str) -> String {
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => format!("{}: {}", message, last.trim()),
        None => message.to_string(),
    }
}

/// Errors surfaced by the media pipeline, tagged with the failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Probing input {index} failed: {source}")]
    Probe {
        index: usize,
        #[source]
        source: ProbeError,
    },

    #[error("Input {index} rejected: {outcome}")]
    Rejected {
        index: usize,
        outcome: ValidationOutcome,
    },

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("{stage} stage failed: {source}")]
    Processing {
        stage: PipelineStage,
        #[source]
        source: ProcessingError,
    },
}

impl PipelineError {
    pub fn processing(stage: PipelineStage, source: ProcessingError) -> Self {
        Self::Processing { stage, source }
    }

    /// Stage in which the failure happened.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Probe { .. } => PipelineStage::Probing,
            Self::Rejected { .. } | Self::Range(_) => PipelineStage::Validating,
            Self::Processing { stage, .. } => *stage,
        }
    }

    /// Index of the input the failure is attributed to, if any.
    pub fn input_index(&self) -> Option<usize> {
        match self {
            Self::Probe { index, .. } | Self::Rejected { index, .. } => Some(*index),
            Self::Processing {
                source: ProcessingError::SourceNotFound { input_index, .. },
                ..
            } => Some(*input_index),
            Self::Processing {
                source: ProcessingError::DecodeFailed { input_index, .. },
                ..
            } => *input_index,
            _ => None,
        }
    }

    /// Short machine-readable kind, used for metrics labels and responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Probe {
                source: ProbeError::NotFound { .. },
                ..
            } => "source_not_found",
            Self::Probe {
                source: ProbeError::Unreadable { .. },
                ..
            } => "unreadable",
            Self::Probe {
                source: ProbeError::Corrupt { .. },
                ..
            } => "corrupt",
            Self::Probe { .. } => "probe_failed",
            Self::Rejected { .. } => "policy_violation",
            Self::Range(RangeError::Malformed { .. }) => "malformed_range",
            Self::Range(RangeError::Invalid { .. }) => "invalid_range",
            Self::Processing { source, .. } => match source {
                ProcessingError::DecodeFailed { .. } => "decode_failed",
                ProcessingError::EncodeFailed { .. } => "encode_failed",
                ProcessingError::InsufficientInputs { .. } => "insufficient_inputs",
                ProcessingError::SourceNotFound { .. } => "source_not_found",
                ProcessingError::Cancelled => "cancelled",
            },
        }
    }

    /// Suggested HTTP status for a request surface.
    ///
    /// Validation failures map to 400, missing sources to 404 and everything
    /// else to 500.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            "source_not_found" => 404,
            "unreadable" | "corrupt" | "policy_violation" | "malformed_range"
            | "invalid_range" | "insufficient_inputs" => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_blames_named_input() {
        let a = Path::new("/data/a.mp4");
        let b = Path::new("/data/b.mp4");
        let out = Path::new("/out/merged/merged_x_a.mp4.partial");
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("/data/b.mp4: Invalid data found when processing input".to_string()),
            Some(1),
        );

        match ProcessingError::from_media(err, &[a, b], out) {
            ProcessingError::DecodeFailed { input_index, .. } => assert_eq!(input_index, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_matches_whole_input_path() {
        let a = Path::new("a.mp4");
        let ba = Path::new("ba.mp4");
        let out = Path::new("merged_x_a.mp4.partial");
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("ba.mp4: Invalid data found when processing input".to_string()),
            Some(1),
        );

        match ProcessingError::from_media(err, &[a, ba], out) {
            ProcessingError::DecodeFailed { input_index, .. } => assert_eq!(input_index, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_output_error_is_encode_failure() {
        let a = Path::new("a.mp4");
        let out = Path::new("/out/trimmed/trimmed_x_a.mp4.partial");
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some(format!("{}: No space left on device", out.display())),
            Some(1),
        );

        assert!(matches!(
            ProcessingError::from_media(err, &[a], out),
            ProcessingError::EncodeFailed { .. }
        ));
    }

    #[test]
    fn test_classify_unknown_encoder() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("Unknown encoder 'libnothing'".to_string()),
            Some(1),
        );
        match ProcessingError::from_media(err, &[Path::new("in.mp4")], Path::new("out.mp4")) {
            ProcessingError::EncodeFailed { detail } => assert!(detail.contains("libnothing")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cancel_and_timeout_map_to_cancelled() {
        let out = Path::new("out.mp4");
        assert!(matches!(
            ProcessingError::from_media(MediaError::Cancelled, &[], out),
            ProcessingError::Cancelled
        ));
        assert!(matches!(
            ProcessingError::from_media(MediaError::Timeout(5), &[], out),
            ProcessingError::Cancelled
        ));
    }

    #[test]
    fn test_status_codes() {
        let not_found = PipelineError::processing(
            PipelineStage::Transforming,
            ProcessingError::SourceNotFound {
                input_index: 1,
                path: PathBuf::from("b.mp4"),
            },
        );
        assert_eq!(not_found.status_code(), 404);
        assert_eq!(not_found.input_index(), Some(1));

        let range = PipelineError::from(RangeError::Malformed {
            field: "start_time",
            raw: "abc".to_string(),
        });
        assert_eq!(range.status_code(), 400);
        assert_eq!(range.stage(), PipelineStage::Validating);

        let encode = PipelineError::processing(
            PipelineStage::Transforming,
            ProcessingError::encode_failed("disk full"),
        );
        assert_eq!(encode.status_code(), 500);
        assert_eq!(encode.kind(), "encode_failed");
    }
}
