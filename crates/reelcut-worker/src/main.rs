//! Edit job worker binary.
//!
//! Reads newline-delimited JSON jobs from the file named by the first
//! argument (stdin when absent) and writes one JSON outcome per line to
//! stdout.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_media::{check_ffmpeg, check_ffprobe};
use reelcut_models::JobId;
use reelcut_worker::{EditJob, JobExecutor, JobOutcome, WorkerConfig, WorkerError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reelcut=info".parse()?);

    // Logs go to stderr; stdout carries outcomes
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting reelcut-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = &config.metrics_addr {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid WORKER_METRICS_ADDR {addr}"))?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!("Serving metrics on {}", addr);
    }

    let ffmpeg = check_ffmpeg().context("ffmpeg is required")?;
    let ffprobe = check_ffprobe().context("ffprobe is required")?;
    info!("Using {} and {}", ffmpeg.display(), ffprobe.display());

    let input: Box<dyn AsyncRead + Unpin + Send> = match std::env::args().nth(1) {
        Some(path) => Box::new(
            tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open job file {path}"))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let executor = Arc::new(JobExecutor::from_config(config));
    let (job_tx, job_rx) = mpsc::channel::<EditJob>(64);
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<JobOutcome>(64);

    let reader_outcomes = outcome_tx.clone();
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        let mut line_no = 0usize;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read jobs: {}", e);
                    break;
                }
            };
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<EditJob>(&line) {
                Ok(job) => {
                    if job_tx.send(job).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Skipping malformed job on line {}: {}", line_no, e);
                    let err = WorkerError::invalid_job(format!("line {line_no}: {e}"));
                    let outcome = JobOutcome::from_result(JobId::new(), Err(err));
                    if reader_outcomes.send(outcome).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(outcome) = outcome_rx.recv().await {
            let mut line = match serde_json::to_string(&outcome) {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to serialize outcome for job {}: {}", outcome.job_id(), e);
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                error!("Failed to write outcome: {}", e);
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let signal_executor = Arc::clone(&executor);
    let shutdown_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_executor.shutdown();
        }
    });

    executor.run(job_rx, outcome_tx).await?;

    // Stop reading once the executor is done so the writer can drain
    reader.abort();
    let _ = reader.await;
    writer.await.context("outcome writer panicked")?;
    shutdown_handle.abort();

    info!("Worker shutdown complete");
    Ok(())
}
