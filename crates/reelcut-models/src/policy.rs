//! Upload acceptance policy.
//!
//! Bounds are carried in an explicit [`PolicyConfig`] so callers (and tests)
//! can vary them per validator instead of relying on module constants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

const MB: u64 = 1024 * 1024;

/// Default minimum upload size (5 MB)
pub const DEFAULT_MIN_SIZE_BYTES: u64 = 5 * MB;
/// Default maximum upload size (25 MB)
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 25 * MB;
/// Default minimum clip duration in seconds
pub const DEFAULT_MIN_DURATION_SECS: f64 = 2.0;
/// Default maximum clip duration in seconds
pub const DEFAULT_MAX_DURATION_SECS: f64 = 25.0;

/// Size and duration bounds a clip must satisfy to be accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyConfig {
    /// Minimum size in bytes (inclusive)
    pub min_size_bytes: u64,
    /// Maximum size in bytes (inclusive)
    pub max_size_bytes: u64,
    /// Minimum duration in seconds (inclusive)
    pub min_duration_secs: f64,
    /// Maximum duration in seconds (inclusive)
    pub max_duration_secs: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: DEFAULT_MIN_SIZE_BYTES,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

impl PolicyConfig {
    /// Create config from environment variables.
    ///
    /// Sizes are given in MB, durations in seconds. Missing, unparsable or
    /// out-of-range values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let size = |key: &str| {
            get(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .and_then(|mb| mb.checked_mul(MB))
        };
        let secs = |key: &str| {
            get(key)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0)
        };
        Self {
            min_size_bytes: size("POLICY_MIN_SIZE_MB").unwrap_or(defaults.min_size_bytes),
            max_size_bytes: size("POLICY_MAX_SIZE_MB").unwrap_or(defaults.max_size_bytes),
            min_duration_secs: secs("POLICY_MIN_DURATION_SECS")
                .unwrap_or(defaults.min_duration_secs),
            max_duration_secs: secs("POLICY_MAX_DURATION_SECS")
                .unwrap_or(defaults.max_duration_secs),
        }
    }
}

/// Kind of policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    SizeTooSmall,
    SizeTooLarge,
    DurationTooShort,
    DurationTooLong,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::SizeTooSmall => "size_too_small",
            ViolationKind::SizeTooLarge => "size_too_large",
            ViolationKind::DurationTooShort => "duration_too_short",
            ViolationKind::DurationTooLong => "duration_too_long",
        }
    }
}

/// A single failed acceptance rule with the measured value and the limit.
///
/// Sizes are expressed in bytes, durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyViolation {
    pub kind: ViolationKind,
    pub measured: f64,
    pub limit: f64,
}

impl PolicyViolation {
    pub fn new(kind: ViolationKind, measured: f64, limit: f64) -> Self {
        Self {
            kind,
            measured,
            limit,
        }
    }

    /// User-facing message for this violation.
    pub fn message(&self) -> String {
        let mb = |bytes: f64| (bytes / MB as f64).floor() as u64;
        match self.kind {
            ViolationKind::SizeTooLarge => {
                format!("File size must be less than {} MB.", mb(self.limit))
            }
            ViolationKind::SizeTooSmall => {
                format!("File size must be greater than {} MB.", mb(self.limit))
            }
            ViolationKind::DurationTooLong => {
                format!("Video duration must be less than {} seconds.", self.limit)
            }
            ViolationKind::DurationTooShort => {
                format!("Video duration must be greater than {} seconds.", self.limit)
            }
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Result of applying the policy: every violation, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub violations: Vec<PolicyViolation>,
}

impl ValidationOutcome {
    /// Build an outcome; `accepted` is true iff there are no violations.
    pub fn from_violations(violations: Vec<PolicyViolation>) -> Self {
        Self {
            accepted: violations.is_empty(),
            violations,
        }
    }

    /// Whether a violation of the given kind was recorded.
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// All user-facing messages, one per violation.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(PolicyViolation::message).collect()
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.accepted {
            return write!(f, "accepted");
        }
        write!(f, "{}", self.messages().join(" "))
    }
}
