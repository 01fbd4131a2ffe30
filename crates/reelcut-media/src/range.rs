//! Trim window resolution.

use serde::{Deserialize, Serialize};

use reelcut_models::TimeRange;

use crate::error::{RangeError, RangeViolation};

/// Resolver settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// End times up to this far past the clip duration are clamped to the
    /// duration instead of rejected. Zero disables clamping.
    #[serde(default)]
    pub end_tolerance_secs: f64,
}

impl ResolverConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            end_tolerance_secs: std::env::var("RANGE_END_TOLERANCE_SECS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(0.0),
        }
    }
}

/// Turns raw `start_time`/`end_time` parameters into a [`TimeRange`] that fits
/// a clip.
#[derive(Debug, Clone, Default)]
pub struct TimeRangeResolver {
    config: ResolverConfig,
}

impl TimeRangeResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve raw parameters against a clip duration.
    ///
    /// A missing (or blank) start means 0 and a missing end means the clip
    /// duration. Present values must parse as finite numbers.
    pub fn resolve(
        &self,
        raw_start: Option<&str>,
        raw_end: Option<&str>,
        duration: f64,
    ) -> Result<TimeRange, RangeError> {
        let start = parse_field("start_time", raw_start)?.unwrap_or(0.0);
        let end = parse_field("end_time", raw_end)?.unwrap_or(duration);
        self.check_bounds(start, end, duration)
    }

    /// Check an already-typed range against a clip duration.
    pub fn check(&self, range: &TimeRange, duration: f64) -> Result<TimeRange, RangeError> {
        self.check_bounds(range.start(), range.end(), duration)
    }

    fn check_bounds(&self, start: f64, end: f64, duration: f64) -> Result<TimeRange, RangeError> {
        let invalid = move |reason| RangeError::Invalid {
            start,
            end,
            duration,
            reason,
        };

        if start < 0.0 {
            return Err(invalid(RangeViolation::NegativeStart));
        }
        // Equality is a zero-length range and is rejected too
        if end <= start {
            return Err(invalid(RangeViolation::Empty));
        }
        let end = if end > duration {
            if end - duration > self.config.end_tolerance_secs || start >= duration {
                return Err(invalid(RangeViolation::PastEnd));
            }
            duration
        } else {
            end
        };

        TimeRange::new(start, end).ok_or_else(|| invalid(RangeViolation::Empty))
    }
}

fn parse_field(field: &'static str, raw: Option<&str>) -> Result<Option<f64>, RangeError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(RangeError::Malformed {
            field,
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: RangeError) -> RangeViolation {
        match err {
            RangeError::Invalid { reason, .. } => reason,
            other => panic!("expected invalid range, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = TimeRangeResolver::default()
            .resolve(Some("5"), Some("5"), 20.0)
            .unwrap_err();
        assert_eq!(reason(err), RangeViolation::Empty);
    }

    #[test]
    fn test_negative_start_rejected() {
        let err = TimeRangeResolver::default()
            .resolve(Some("-1"), Some("10"), 20.0)
            .unwrap_err();
        assert_eq!(reason(err), RangeViolation::NegativeStart);
    }

    #[test]
    fn test_full_range_accepted() {
        let range = TimeRangeResolver::default()
            .resolve(Some("0"), Some("20"), 20.0)
            .unwrap();
        assert_eq!((range.start(), range.end()), (0.0, 20.0));
    }

    #[test]
    fn test_defaults_when_absent() {
        let resolver = TimeRangeResolver::default();
        let range = resolver.resolve(None, None, 12.5).unwrap();
        assert_eq!((range.start(), range.end()), (0.0, 12.5));

        let range = resolver.resolve(Some("3"), Some(""), 12.5).unwrap();
        assert_eq!((range.start(), range.end()), (3.0, 12.5));
    }

    #[test]
    fn test_malformed_input() {
        let resolver = TimeRangeResolver::default();
        assert_eq!(
            resolver.resolve(Some("abc"), None, 10.0).unwrap_err(),
            RangeError::Malformed {
                field: "start_time",
                raw: "abc".to_string()
            }
        );
        assert!(matches!(
            resolver.resolve(None, Some("inf"), 10.0),
            Err(RangeError::Malformed { field: "end_time", .. })
        ));
        assert!(matches!(
            resolver.resolve(Some("NaN"), None, 10.0),
            Err(RangeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_first_failing_check_wins() {
        // Negative start and past end: the start check comes first
        let err = TimeRangeResolver::default()
            .resolve(Some("-2"), Some("30"), 20.0)
            .unwrap_err();
        assert_eq!(reason(err), RangeViolation::NegativeStart);

        let err = TimeRangeResolver::default()
            .resolve(Some("8"), Some("21"), 20.0)
            .unwrap_err();
        assert_eq!(reason(err), RangeViolation::PastEnd);
    }

    #[test]
    fn test_tolerance_clamps_end() {
        let resolver = TimeRangeResolver::new(ResolverConfig {
            end_tolerance_secs: 0.05,
        });
        let range = resolver.resolve(Some("1"), Some("20.04"), 20.0).unwrap();
        assert_eq!(range.end(), 20.0);

        match resolver.resolve(Some("1"), Some("20.2"), 20.0).unwrap_err() {
            RangeError::Invalid { end, reason, .. } => {
                assert_eq!(end, 20.2);
                assert_eq!(reason, RangeViolation::PastEnd);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(resolver.resolve(Some("20.01"), Some("20.04"), 20.0).is_err());
    }

    #[test]
    fn test_check_typed_range() {
        let resolver = TimeRangeResolver::default();
        let range = TimeRange::new(2.0, 9.0).unwrap();
        assert!(resolver.check(&range, 10.0).is_ok());
        assert_eq!(
            reason(resolver.check(&range, 8.0).unwrap_err()),
            RangeViolation::PastEnd
        );
    }
}
