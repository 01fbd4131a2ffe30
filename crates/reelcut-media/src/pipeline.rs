//! Orchestration: probe, validate, transform, write.
//!
//! A [`MediaPipeline`] holds no per-request state; each call walks
//! `Idle -> Probing -> Validating -> Transforming -> Writing -> Done`, and
//! any failure jumps straight to `Failed` carrying the original error and the
//! stage it came from. Nothing is retried here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use reelcut_models::{
    Artifact, ArtifactCategory, EncodingConfig, MergeRequest, PolicyConfig, SourceMedia,
    TimeRange, TrimRequest,
};

use crate::engine::{FfmpegEngine, MediaEngine, RunOptions};
use crate::error::{PipelineError, ProcessingError, RangeError};
use crate::metrics;
use crate::policy::PolicyValidator;
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::range::{ResolverConfig, TimeRangeResolver};
use crate::writer::ArtifactWriter;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Probing,
    Validating,
    Transforming,
    Writing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Probing => "probing",
            PipelineStage::Validating => "validating",
            PipelineStage::Transforming => "transforming",
            PipelineStage::Writing => "writing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory artifacts are written under
    pub output_root: PathBuf,
    pub policy: PolicyConfig,
    pub resolver: ResolverConfig,
    pub encoding: EncodingConfig,
}

impl PipelineConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            policy: PolicyConfig::default(),
            resolver: ResolverConfig::default(),
            encoding: EncodingConfig::default(),
        }
    }

    /// Policy, resolver and encoding settings from the environment.
    pub fn from_env(output_root: impl Into<PathBuf>) -> Self {
        Self {
            policy: PolicyConfig::from_env(),
            resolver: ResolverConfig::from_env(),
            encoding: EncodingConfig::from_env(),
            ..Self::new(output_root)
        }
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Tracks one invocation through the stages for logging and metrics.
struct StageTracker {
    operation: &'static str,
    stage: PipelineStage,
    started: Instant,
}

impl StageTracker {
    fn start(operation: &'static str) -> Self {
        Self {
            operation,
            stage: PipelineStage::Idle,
            started: Instant::now(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!(operation = self.operation, from = %self.stage, to = %stage, "Pipeline stage");
        self.stage = stage;
    }

    fn finish<T>(mut self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        let elapsed = self.started.elapsed().as_secs_f64();
        match &result {
            Ok(_) => {
                self.enter(PipelineStage::Done);
                metrics::record_pipeline_run(self.operation, "success", elapsed);
            }
            Err(e) => {
                warn!(
                    operation = self.operation,
                    stage = %e.stage(),
                    kind = e.kind(),
                    input_index = ?e.input_index(),
                    error = %e,
                    "Pipeline failed"
                );
                self.enter(PipelineStage::Failed);
                metrics::record_pipeline_run(self.operation, e.kind(), elapsed);
            }
        }
        result
    }
}

/// Composes probe, policy, range resolution, engines and the writer.
///
/// Cheap to clone; clones share the probe and engine.
#[derive(Clone)]
pub struct MediaPipeline {
    probe: Arc<dyn MediaProbe>,
    engine: Arc<dyn MediaEngine>,
    validator: PolicyValidator,
    resolver: TimeRangeResolver,
    writer: ArtifactWriter,
}

impl MediaPipeline {
    /// Pipeline backed by FFprobe and FFmpeg.
    pub fn new(config: PipelineConfig) -> Self {
        let engine = FfmpegEngine::new(config.encoding.clone());
        Self::with_components(config, Arc::new(FfprobeProbe::new()), Arc::new(engine))
    }

    /// Pipeline with custom probe and engine implementations.
    pub fn with_components(
        config: PipelineConfig,
        probe: Arc<dyn MediaProbe>,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            probe,
            engine,
            validator: PolicyValidator::new(config.policy),
            resolver: TimeRangeResolver::new(config.resolver),
            writer: ArtifactWriter::new(config.output_root, &config.encoding),
        }
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    pub fn resolver(&self) -> &TimeRangeResolver {
        &self.resolver
    }

    /// Probe an uploaded file and apply the acceptance policy.
    pub async fn ingest(&self, path: &Path) -> Result<SourceMedia, PipelineError> {
        let mut tracker = StageTracker::start("ingest");
        let result = async {
            tracker.enter(PipelineStage::Probing);
            let media = self.probe_one(0, path).await?;

            tracker.enter(PipelineStage::Validating);
            let outcome = self.validator.validate(&media);
            if !outcome.accepted {
                return Err(PipelineError::Rejected { index: 0, outcome });
            }
            info!(path = %path.display(), duration = media.duration, size = media.size, "Upload accepted");
            Ok(media)
        }
        .await;
        tracker.finish(result)
    }

    /// Trim a probed source.
    pub async fn trim(
        &self,
        request: &TrimRequest,
        options: &RunOptions,
    ) -> Result<Artifact, PipelineError> {
        self.run_trim(&request.source.path, options, |resolver, duration| {
            resolver.check(&request.range, duration)
        })
        .await
    }

    /// Trim a file using raw `start_time`/`end_time` parameters.
    pub async fn trim_raw(
        &self,
        path: &Path,
        raw_start: Option<&str>,
        raw_end: Option<&str>,
        options: &RunOptions,
    ) -> Result<Artifact, PipelineError> {
        self.run_trim(path, options, |resolver, duration| {
            resolver.resolve(raw_start, raw_end, duration)
        })
        .await
    }

    async fn run_trim<R>(
        &self,
        path: &Path,
        options: &RunOptions,
        resolve_range: R,
    ) -> Result<Artifact, PipelineError>
    where
        R: FnOnce(&TimeRangeResolver, f64) -> Result<TimeRange, RangeError>,
    {
        let mut tracker = StageTracker::start("trim");
        let result = async {
            tracker.enter(PipelineStage::Probing);
            let source = self.probe_one(0, path).await?;

            tracker.enter(PipelineStage::Validating);
            let range = resolve_range(&self.resolver, source.duration)?;
            let request = TrimRequest::new(source, range);
            let basename = request.source.basename();
            let expected = request.range.duration();

            self.transform_and_write(&mut tracker, ArtifactCategory::Trimmed, &basename, expected, |output| async move {
                self.engine.trim(&request, &output, options).await
            })
            .await
        }
        .await;
        tracker.finish(result)
    }

    /// Concatenate probed sources in order.
    pub async fn merge(
        &self,
        request: &MergeRequest,
        options: &RunOptions,
    ) -> Result<Artifact, PipelineError> {
        let paths: Vec<PathBuf> = request.sources.iter().map(|s| s.path.clone()).collect();
        self.merge_paths(&paths, options).await
    }

    /// Concatenate files in order.
    pub async fn merge_paths(
        &self,
        paths: &[PathBuf],
        options: &RunOptions,
    ) -> Result<Artifact, PipelineError> {
        let mut tracker = StageTracker::start("merge");
        let result = async {
            tracker.enter(PipelineStage::Probing);
            let mut sources = Vec::with_capacity(paths.len());
            for (index, path) in paths.iter().enumerate() {
                sources.push(self.probe_one(index, path).await?);
            }

            tracker.enter(PipelineStage::Validating);
            let request = MergeRequest::new(sources);
            if request.validate().is_err() {
                return Err(PipelineError::processing(
                    PipelineStage::Validating,
                    ProcessingError::InsufficientInputs {
                        given: request.sources.len(),
                    },
                ));
            }

            let basename = request.sources[0].basename();
            let expected: f64 = request.sources.iter().map(|s| s.duration).sum();
            self.transform_and_write(&mut tracker, ArtifactCategory::Merged, &basename, expected, |output| async move {
                self.engine.merge(&request, &output, options).await
            })
            .await
        }
        .await;
        tracker.finish(result)
    }

    async fn probe_one(&self, index: usize, path: &Path) -> Result<SourceMedia, PipelineError> {
        self.probe
            .probe(path)
            .await
            .map_err(|source| PipelineError::Probe { index, source })
    }

    /// Run an engine into a fresh partial file, then commit and describe it.
    async fn transform_and_write<F, Fut>(
        &self,
        tracker: &mut StageTracker,
        category: ArtifactCategory,
        basename: &str,
        expected_secs: f64,
        encode: F,
    ) -> Result<Artifact, PipelineError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: std::future::Future<Output = Result<(), ProcessingError>>,
    {
        tracker.enter(PipelineStage::Transforming);
        let mut partial = self
            .writer
            .prepare(category, basename)
            .await
            .map_err(|e| PipelineError::processing(PipelineStage::Writing, e))?;

        match encode(partial.partial_path().to_path_buf()).await {
            Ok(()) => {}
            // Dropping the guard deletes the partial file
            Err(ProcessingError::Cancelled) => {
                drop(partial);
                return Err(PipelineError::processing(
                    PipelineStage::Transforming,
                    ProcessingError::Cancelled,
                ));
            }
            Err(e) => {
                partial.keep();
                return Err(PipelineError::processing(PipelineStage::Transforming, e));
            }
        }

        tracker.enter(PipelineStage::Writing);
        // The output must probe as media before it gets its final name
        let mut media = match self.probe.probe(partial.partial_path()).await {
            Ok(media) => media,
            Err(e) => {
                partial.keep();
                return Err(PipelineError::processing(
                    PipelineStage::Writing,
                    ProcessingError::encode_failed(format!("output is not readable media: {}", e)),
                ));
            }
        };

        let drift = (media.duration - expected_secs).abs();
        if drift > media.frame_duration() {
            warn!(
                expected = expected_secs,
                actual = media.duration,
                "Output duration is off by {:.3}s, more than one frame",
                drift
            );
        }

        media.path = partial
            .commit()
            .await
            .map_err(|e| PipelineError::processing(PipelineStage::Writing, e))?;

        let artifact = Artifact::from_probe(category, media);
        info!(
            category = %category,
            path = %artifact.path.display(),
            duration = artifact.duration,
            size = artifact.size,
            "Artifact written"
        );
        Ok(artifact)
    }
}

impl fmt::Debug for MediaPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPipeline")
            .field("validator", &self.validator)
            .field("resolver", &self.resolver)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}
