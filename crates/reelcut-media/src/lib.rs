//! FFmpeg-backed media pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts via tokio
//! - Probing, acceptance policy and trim-window resolution
//! - Trim and merge engines sharing one canonical encoding
//! - Collision-free artifact writing with `.partial` staging
//! - The [`MediaPipeline`] orchestrator tying them together

pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod merge;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod probe;
pub mod progress;
pub mod range;
pub mod trim;
pub mod writer;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine, RunOptions};
pub use error::{
    MediaError, MediaResult, PipelineError, ProbeError, ProcessingError, RangeError,
    RangeViolation,
};
pub use filters::Geometry;
pub use merge::MergeEngine;
pub use pipeline::{MediaPipeline, PipelineConfig, PipelineStage};
pub use policy::PolicyValidator;
pub use probe::{FfprobeProbe, MediaProbe};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use range::{ResolverConfig, TimeRangeResolver};
pub use trim::TrimEngine;
pub use writer::{ArtifactWriter, PartialArtifact, PARTIAL_SUFFIX};
