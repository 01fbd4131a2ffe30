//! Typed trim and merge requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media::SourceMedia;

/// A `[start, end)` interval in seconds.
///
/// Construction guarantees `0 <= start < end` with both values finite. The
/// upper bound against a particular clip's duration is checked by the range
/// resolver, which knows the clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: f64,
    end: f64,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: f64,
    end: f64,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = String;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
            .ok_or_else(|| format!("invalid time range [{}, {})", raw.start, raw.end))
    }
}

impl TimeRange {
    /// Create a range, returning `None` unless `0 <= start < end`.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        if start < 0.0 || end <= start {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the range in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}s, {:.3}s)", self.start, self.end)
    }
}

/// Extract `range` from `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimRequest {
    pub source: SourceMedia,
    pub range: TimeRange,
}

impl TrimRequest {
    pub fn new(source: SourceMedia, range: TimeRange) -> Self {
        Self { source, range }
    }
}

/// Concatenate `sources` in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergeRequest {
    /// Ordered sources; order defines output order
    pub sources: Vec<SourceMedia>,
}

impl MergeRequest {
    /// Minimum number of sources a merge accepts.
    pub const MIN_SOURCES: usize = 2;

    pub fn new(sources: Vec<SourceMedia>) -> Self {
        Self { sources }
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.sources.len() < Self::MIN_SOURCES {
            return Err(format!(
                "At least {} videos are required to merge, got {}",
                Self::MIN_SOURCES,
                self.sources.len()
            ));
        }
        Ok(())
    }

    /// Sum of the source durations.
    pub fn total_duration(&self) -> f64 {
        self.sources.iter().map(|s| s.duration).sum()
    }
}
