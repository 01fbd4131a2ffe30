//! Encoder progress reported through `-progress pipe:2`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One progress snapshot from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Output written so far, in milliseconds
    pub out_time_ms: i64,
    /// Same position as FFmpeg prints it (`HH:MM:SS.micros`)
    pub out_time: String,
    /// Multiple of realtime
    pub speed: f64,
    /// FFmpeg sent `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Seconds of output written so far.
    pub fn out_secs(&self) -> f64 {
        self.out_time_ms.max(0) as f64 / 1000.0
    }

    /// Share of an expected output length already encoded, in `[0, 1]`.
    pub fn fraction_of(&self, expected_secs: f64) -> f64 {
        if self.is_complete {
            return 1.0;
        }
        if !(expected_secs > 0.0) {
            return 0.0;
        }
        (self.out_secs() / expected_secs).clamp(0.0, 1.0)
    }

    /// Seconds left at the current speed, once FFmpeg reports one.
    pub fn remaining_secs(&self, expected_secs: f64) -> Option<f64> {
        if self.is_complete {
            return Some(0.0);
        }
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        Some((expected_secs - self.out_secs()).max(0.0) / self.speed)
    }
}

/// Receives progress snapshots while an encode runs.
///
/// Shared so one callback can follow a job across pipeline stages.
pub type ProgressCallback = Arc<dyn Fn(FfmpegProgress) + Send + Sync + 'static>;
