//! Upload acceptance rules.

use reelcut_models::{PolicyConfig, PolicyViolation, SourceMedia, ValidationOutcome, ViolationKind};

use crate::metrics;

/// Applies size and duration bounds to probed metadata.
///
/// Validation never fails: every broken rule is collected into the returned
/// [`ValidationOutcome`] so callers can report all problems at once.
#[derive(Debug, Clone, Default)]
pub struct PolicyValidator {
    config: PolicyConfig,
}

impl PolicyValidator {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Validate probed media.
    pub fn validate(&self, media: &SourceMedia) -> ValidationOutcome {
        self.validate_measurements(media.size, media.duration)
    }

    /// Validate raw measurements (bytes, seconds).
    ///
    /// Bounds are inclusive. Rules are checked in a fixed order: size over
    /// the maximum, size under the minimum, then the same for duration.
    pub fn validate_measurements(&self, size: u64, duration: f64) -> ValidationOutcome {
        let c = &self.config;
        let mut violations = Vec::new();

        if size > c.max_size_bytes {
            violations.push(PolicyViolation::new(
                ViolationKind::SizeTooLarge,
                size as f64,
                c.max_size_bytes as f64,
            ));
        }
        if size < c.min_size_bytes {
            violations.push(PolicyViolation::new(
                ViolationKind::SizeTooSmall,
                size as f64,
                c.min_size_bytes as f64,
            ));
        }
        if duration > c.max_duration_secs {
            violations.push(PolicyViolation::new(
                ViolationKind::DurationTooLong,
                duration,
                c.max_duration_secs,
            ));
        }
        if duration < c.min_duration_secs {
            violations.push(PolicyViolation::new(
                ViolationKind::DurationTooShort,
                duration,
                c.min_duration_secs,
            ));
        }

        for violation in &violations {
            metrics::record_policy_rejection(violation.kind.as_str());
        }

        ValidationOutcome::from_violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_oversized_file_rejected() {
        let outcome = PolicyValidator::default().validate_measurements(26 * MB, 10.0);
        assert!(!outcome.accepted);
        assert!(outcome.has(ViolationKind::SizeTooLarge));
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.messages()[0], "File size must be less than 25 MB.");
    }

    #[test]
    fn test_short_clip_rejected() {
        let outcome = PolicyValidator::default().validate_measurements(10 * MB, 1.0);
        assert!(!outcome.accepted);
        assert!(outcome.has(ViolationKind::DurationTooShort));
        assert_eq!(outcome.violations[0].measured, 1.0);
        assert_eq!(outcome.violations[0].limit, 2.0);
    }

    #[test]
    fn test_collects_all_violations() {
        let outcome = PolicyValidator::default().validate_measurements(MB, 30.0);
        let kinds: Vec<_> = outcome.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::SizeTooSmall, ViolationKind::DurationTooLong]
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let validator = PolicyValidator::default();
        assert!(validator.validate_measurements(5 * MB, 2.0).accepted);
        assert!(validator.validate_measurements(25 * MB, 25.0).accepted);
    }

    #[test]
    fn test_custom_bounds() {
        let validator = PolicyValidator::new(PolicyConfig {
            min_size_bytes: 0,
            max_size_bytes: MB,
            min_duration_secs: 0.5,
            max_duration_secs: 60.0,
        });
        assert!(validator.validate_measurements(MB / 2, 45.0).accepted);
        assert!(validator
            .validate_measurements(2 * MB, 45.0)
            .has(ViolationKind::SizeTooLarge));
    }
}
