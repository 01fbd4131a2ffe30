//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PIPELINE_RUNS_TOTAL: &str = "reelcut_pipeline_runs_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "reelcut_pipeline_duration_seconds";
    pub const FFMPEG_DURATION_SECONDS: &str = "reelcut_ffmpeg_duration_seconds";
    pub const POLICY_REJECTIONS_TOTAL: &str = "reelcut_policy_rejections_total";
}

/// Record a finished pipeline run.
pub fn record_pipeline_run(operation: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::PIPELINE_RUNS_TOTAL, &labels).increment(1);

    let labels = [("operation", operation.to_string())];
    histogram!(names::PIPELINE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record wall time of one FFmpeg invocation.
pub fn record_ffmpeg_duration(duration_secs: f64) {
    histogram!(names::FFMPEG_DURATION_SECONDS).record(duration_secs);
}

/// Record a policy violation.
pub fn record_policy_rejection(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::POLICY_REJECTIONS_TOTAL, &labels).increment(1);
}
