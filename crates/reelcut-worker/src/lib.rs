//! Trim and merge job worker.
//!
//! This crate provides:
//! - Typed ingest, trim and merge jobs with JSON outcomes
//! - The edit processor that ties stored videos to the media pipeline
//! - A bounded-concurrency job executor with timeouts and graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod logging;
pub mod processor;

#[cfg(test)]
mod testing;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use job::{EditJob, IngestJob, JobFailure, JobOutcome, MergeJob, TrimJob};
pub use logging::JobLogger;
pub use processor::EditProcessor;
