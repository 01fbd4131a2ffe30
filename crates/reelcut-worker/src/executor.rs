//! Job executor.

use metrics::counter;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, error, info, warn};

use reelcut_media::RunOptions;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::job::{EditJob, JobOutcome};
use crate::processor::EditProcessor;

const JOBS_TOTAL: &str = "reelcut_jobs_total";

/// Runs jobs from a channel with bounded concurrency and reports one
/// outcome per job.
///
/// Shutdown stops intake, lets in-flight jobs finish for up to
/// `shutdown_timeout`, then cancels them. Cancelled encodes leave no
/// partial output behind.
pub struct JobExecutor {
    config: WorkerConfig,
    processor: Arc<EditProcessor>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    cancel: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, processor: EditProcessor) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let (cancel, _) = watch::channel(false);

        Self {
            config,
            processor: Arc::new(processor),
            job_semaphore,
            shutdown,
            cancel,
        }
    }

    /// Build the default processor from config.
    pub fn from_config(config: WorkerConfig) -> Self {
        let processor = EditProcessor::from_config(&config);
        Self::new(config, processor)
    }

    /// Consume jobs until the channel closes or shutdown is signalled.
    pub async fn run(
        &self,
        mut jobs: mpsc::Receiver<EditJob>,
        outcomes: mpsc::Sender<JobOutcome>,
    ) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            let permit = tokio::select! {
                _ = wait_for_signal(&mut shutdown_rx) => {
                    info!("Shutdown signal received, stopping executor");
                    break;
                }
                permit = Arc::clone(&self.job_semaphore).acquire_owned() => permit
                    .map_err(|_| WorkerError::config_error("Job semaphore closed"))?,
            };

            let job = tokio::select! {
                _ = wait_for_signal(&mut shutdown_rx) => {
                    info!("Shutdown signal received, stopping executor");
                    break;
                }
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => {
                        debug!("Job channel closed");
                        break;
                    }
                },
            };

            let processor = Arc::clone(&self.processor);
            let outcomes = outcomes.clone();
            let options = RunOptions::new().with_cancel(self.cancel.subscribe());
            let timeout = self.config.job_timeout;

            tokio::spawn(async move {
                let _permit = permit;
                let outcome = Self::execute_job(processor, job, options, timeout).await;
                if outcomes.send(outcome).await.is_err() {
                    warn!("Outcome receiver dropped");
                }
            });
        }

        // Jobs still queued are reported, not run
        jobs.close();
        while let Ok(job) = jobs.try_recv() {
            let outcome = JobOutcome::from_result(job.job_id().clone(), Err(WorkerError::Cancelled));
            if outcomes.send(outcome).await.is_err() {
                break;
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}, cancelling",
                self.config.shutdown_timeout
            );
            let _ = self.cancel.send(true);
            self.wait_for_jobs().await;
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Execute a single job under the job timeout.
    async fn execute_job(
        processor: Arc<EditProcessor>,
        job: EditJob,
        options: RunOptions,
        timeout: Option<Duration>,
    ) -> JobOutcome {
        let job_id = job.job_id().clone();
        let operation = job.operation();
        info!("Executing job {}", job_id);
        let started = Instant::now();

        let work = processor.process(&job, &options);
        // Dropping the job future on timeout kills FFmpeg and removes the
        // partial output.
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or_else(|_| Err(WorkerError::Timeout(limit.as_secs()))),
            None => work.await,
        };

        let outcome_label = match &result {
            Ok(video) => {
                info!(
                    "Job {} completed in {:.1}s: video {}",
                    job_id,
                    started.elapsed().as_secs_f64(),
                    video.id
                );
                "completed"
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                e.kind()
            }
        };
        let labels = [
            ("operation", operation.to_string()),
            ("outcome", outcome_label.to_string()),
        ];
        counter!(JOBS_TOTAL, &labels).increment(1);

        JobOutcome::from_result(job_id, result)
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Resolve once the flag is raised.
async fn wait_for_signal(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}
