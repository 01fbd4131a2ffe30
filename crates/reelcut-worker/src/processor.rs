//! Edit processing against stored videos.
//!
//! The processor is the glue between stored videos and the media pipeline:
//! it resolves ids to local files, runs the pipeline, makes the artifact
//! durable and records it. Derived fields (size, duration, geometry) come
//! from the pipeline's probe before anything is persisted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, Instrument};

use reelcut_media::{FfmpegProgress, MediaPipeline, PipelineConfig, RunOptions};
use reelcut_models::{Artifact, NewVideo, VideoId, VideoRecord};
use reelcut_storage::{FileStorage, JsonRecordStore, LocalFileStorage, RecordStore, StorageError};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::job::{EditJob, MergeJob, TrimJob};
use crate::logging::JobLogger;

/// Runs edit jobs end to end.
#[derive(Clone)]
pub struct EditProcessor {
    pipeline: MediaPipeline,
    files: Arc<dyn FileStorage>,
    records: Arc<dyn RecordStore>,
}

impl EditProcessor {
    pub fn new(
        pipeline: MediaPipeline,
        files: Arc<dyn FileStorage>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            pipeline,
            files,
            records,
        }
    }

    /// FFmpeg pipeline, local file storage and JSON records, all from config.
    ///
    /// Artifacts are written inside the storage root, so storing them is a
    /// no-op.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let pipeline = MediaPipeline::new(PipelineConfig::from_env(&config.output_dir));
        Self::new(
            pipeline,
            Arc::new(LocalFileStorage::new(&config.output_dir)),
            Arc::new(JsonRecordStore::new(&config.records_dir)),
        )
    }

    /// Run any job.
    pub async fn process(&self, job: &EditJob, options: &RunOptions) -> WorkerResult<VideoRecord> {
        let logger = JobLogger::new(job.job_id(), job.operation());
        let span = logger.create_span();

        async {
            logger.log_start(&describe(job));

            let result = match job.validate() {
                Err(e) => Err(e),
                Ok(()) => match job {
                    EditJob::Ingest(j) => self.ingest_upload(&j.path, &j.title).await,
                    EditJob::Trim(j) => self.trim(j, options).await,
                    EditJob::Merge(j) => self.merge(j, options).await,
                },
            };

            match &result {
                Ok(record) => logger.log_completion(&format!("video {} ({:.2}s)", record.id, record.duration)),
                Err(e) if e.is_retryable() => logger.log_warning(&format!("{} (retryable)", e)),
                Err(e) => logger.log_error(&e.to_string()),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Validate an uploaded file, store it and record it.
    pub async fn ingest_upload(&self, path: &Path, title: &str) -> WorkerResult<VideoRecord> {
        let media = self.pipeline.ingest(path).await?;
        let key = self.files.store(path).await?;
        let record = self.records.insert(NewVideo::upload(title, key, &media)).await?;
        Ok(record)
    }

    /// Trim a stored video into a new stored video.
    pub async fn trim(&self, job: &TrimJob, options: &RunOptions) -> WorkerResult<VideoRecord> {
        let (source, path) = self.load(&job.video_id, None).await?;

        let expected = self
            .pipeline
            .resolver()
            .resolve(job.start_time.as_deref(), job.end_time.as_deref(), source.duration)
            .map(|range| range.duration())
            .unwrap_or(source.duration);
        let options = with_progress_logging(options, JobLogger::new(&job.job_id, "trim"), expected);

        let artifact = self
            .pipeline
            .trim_raw(
                &path,
                job.start_time.as_deref(),
                job.end_time.as_deref(),
                &options,
            )
            .await?;

        let title = job
            .title
            .clone()
            .unwrap_or_else(|| format!("{} (trimmed)", source.title));
        self.save(title, &artifact, vec![source.id]).await
    }

    /// Merge stored videos, in job order, into a new stored video.
    pub async fn merge(&self, job: &MergeJob, options: &RunOptions) -> WorkerResult<VideoRecord> {
        let mut sources = Vec::with_capacity(job.video_ids.len());
        let mut paths = Vec::with_capacity(job.video_ids.len());
        for (index, id) in job.video_ids.iter().enumerate() {
            let (record, path) = self.load(id, Some(index)).await?;
            sources.push(record);
            paths.push(path);
        }

        let expected: f64 = sources.iter().map(|s| s.duration).sum();
        let options = with_progress_logging(options, JobLogger::new(&job.job_id, "merge"), expected);
        let artifact = self.pipeline.merge_paths(&paths, &options).await?;

        let title = job.title.clone().unwrap_or_else(|| {
            sources
                .iter()
                .map(|s| s.title.as_str())
                .collect::<Vec<_>>()
                .join(" + ")
        });
        let ids = sources.into_iter().map(|s| s.id).collect();
        self.save(title, &artifact, ids).await
    }

    /// Look up a stored video and its local file.
    async fn load(&self, id: &VideoId, index: Option<usize>) -> WorkerResult<(VideoRecord, PathBuf)> {
        let not_found = |e: StorageError| {
            if e.is_not_found() {
                WorkerError::VideoNotFound {
                    id: id.clone(),
                    index,
                }
            } else {
                WorkerError::Storage(e)
            }
        };

        let record = self.records.get(id).await.map_err(not_found)?;
        let path = self.files.resolve(&record.file).await.map_err(not_found)?;
        debug!(video_id = %id, path = %path.display(), "Resolved stored video");
        Ok((record, path))
    }

    async fn save(
        &self,
        title: String,
        artifact: &Artifact,
        derived_from: Vec<VideoId>,
    ) -> WorkerResult<VideoRecord> {
        let key = self.files.store(artifact.path()).await?;
        let record = self
            .records
            .insert(NewVideo::artifact(title, key, artifact, derived_from))
            .await?;
        Ok(record)
    }
}

fn describe(job: &EditJob) -> String {
    match job {
        EditJob::Ingest(j) => format!("ingest {}", j.path.display()),
        EditJob::Trim(j) => format!(
            "trim {} [{}, {})",
            j.video_id,
            j.start_time.as_deref().unwrap_or("0"),
            j.end_time.as_deref().unwrap_or("end")
        ),
        EditJob::Merge(j) => format!("merge {} videos", j.video_ids.len()),
    }
}

/// Turns encoder progress into one line per tenth of the expected output.
struct ProgressReporter {
    expected_secs: f64,
    reported: AtomicU64,
}

impl ProgressReporter {
    fn new(expected_secs: f64) -> Self {
        Self {
            expected_secs,
            reported: AtomicU64::new(0),
        }
    }

    /// Message for the first snapshot that reaches a new tenth, if any.
    fn report(&self, progress: &FfmpegProgress) -> Option<String> {
        let tenth = (progress.fraction_of(self.expected_secs) * 10.0).floor() as u64;
        if tenth == 0 || self.reported.fetch_max(tenth, Ordering::Relaxed) >= tenth {
            return None;
        }
        let eta = progress
            .remaining_secs(self.expected_secs)
            .map(|secs| format!(", about {:.0}s left", secs))
            .unwrap_or_default();
        Some(format!("{}% encoded at {:.2}x{}", tenth * 10, progress.speed, eta))
    }
}

/// Log encoder progress through the job logger unless the caller brought a
/// callback.
fn with_progress_logging(options: &RunOptions, logger: JobLogger, expected_secs: f64) -> RunOptions {
    if options.progress.is_some() {
        return options.clone();
    }
    let reporter = ProgressReporter::new(expected_secs);
    options.clone().with_progress(Arc::new(move |progress: FfmpegProgress| {
        if let Some(message) = reporter.report(&progress) {
            logger.log_progress(&message);
        }
    }))
}
