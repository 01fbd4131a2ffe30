//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs (encodes are CPU-bound)
    pub max_concurrent_jobs: usize,
    /// Per-job timeout; `None` disables it
    pub job_timeout: Option<Duration>,
    /// How long shutdown waits for in-flight jobs before cancelling them
    pub shutdown_timeout: Duration,
    /// Media root: uploads and artifacts live here
    pub output_dir: PathBuf,
    /// Directory of the JSON record store
    pub records_dir: PathBuf,
    /// Prometheus listener address, if metrics are exported
    pub metrics_addr: Option<String>,
}

fn default_max_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_jobs(),
            job_timeout: Some(Duration::from_secs(600)),
            shutdown_timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("/tmp/reelcut/media"),
            records_dir: PathBuf::from("/tmp/reelcut/records"),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            job_timeout: match std::env::var("WORKER_JOB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.job_timeout,
            },
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            output_dir: std::env::var("WORKER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            records_dir: std::env::var("WORKER_RECORDS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.records_dir),
            metrics_addr: std::env::var("WORKER_METRICS_ADDR")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}
