//! Offline interval to progression stage conversion.
//!
//! [`convert`] is a pure function: the same elapsed interval, rate, caps,
//! and prior remainder always produce the same stage count and new
//! remainder. Fractional progress is carried between conversions so that
//! many short absences add up to the same result as one long one.
//!
//! # Invariants
//!
//! - The returned remainder is always in `[0, 1)`.
//! - The returned stage count never exceeds the per-application cap,
//!   however long the interval.
//! - Elapsed time beyond `max_offline_hours` is ignored.
//! - When the cap is hit, the excess is discarded rather than carried.

use crate::config::GrowthConfig;

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Rate and caps for one conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionParams {
    /// Stages accrued per hour of elapsed time.
    pub stages_per_hour: f64,
    /// Longest interval that still accrues stages, in hours.
    pub max_offline_hours: f64,
    /// Most stages a single application may carry.
    pub max_stages_per_application: u32,
}

impl ConversionParams {
    /// Parameters from the growth configuration, resolving
    /// `ticks_per_stage` into an hourly rate.
    pub fn from_config(config: &GrowthConfig) -> Self {
        Self {
            stages_per_hour: config.effective_stages_per_hour(),
            max_offline_hours: config.max_offline_hours,
            max_stages_per_application: config.max_stages_per_application,
        }
    }
}

/// Result of one conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    /// Whole stages to apply this session.
    pub stages: u32,
    /// Fractional progress carried to the next conversion.
    pub remainder: f64,
}

/// Convert an elapsed interval into whole stages plus a carried remainder.
///
/// A `prior_remainder` that is not finite or lies outside `[0, 1)` is
/// treated as zero. A negative or non-finite rate or hour cap is treated
/// as zero.
pub fn convert(elapsed_ms: u64, params: &ConversionParams, prior_remainder: f64) -> Conversion {
    let prior = sanitize_remainder(prior_remainder);
    let rate = non_negative(params.stages_per_hour);
    let max_ms = non_negative(params.max_offline_hours) * MILLIS_PER_HOUR;

    #[allow(clippy::cast_precision_loss)]
    let clamped_ms = (elapsed_ms as f64).min(max_ms);
    let raw = clamped_ms * rate / MILLIS_PER_HOUR + prior;
    let whole = raw.floor();
    let cap = params.max_stages_per_application;

    if whole > f64::from(cap) {
        return Conversion {
            stages: cap,
            remainder: 0.0,
        };
    }

    // `whole` is an integer in `[0, cap]` here.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let stages = whole as u32;
    Conversion {
        stages,
        remainder: sanitize_remainder(raw - whole),
    }
}

/// Clamp a persisted remainder into `[0, 1)`, discarding malformed values.
pub fn sanitize_remainder(value: f64) -> f64 {
    if value.is_finite() && (0.0..1.0).contains(&value) {
        value
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: u64 = 3_600_000;
    const MINUTE_MS: u64 = 60_000;

    fn params() -> ConversionParams {
        ConversionParams {
            stages_per_hour: 6.0,
            max_offline_hours: 24.0,
            max_stages_per_application: 7,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ten_hours_hits_the_cap_and_discards_excess() {
        let result = convert(10 * HOUR_MS, &params(), 0.0);
        assert_eq!(result.stages, 7);
        assert!(close(result.remainder, 0.0));
    }

    #[test]
    fn zero_elapsed_carries_prior_remainder() {
        let result = convert(0, &params(), 0.5);
        assert_eq!(result.stages, 0);
        assert!(close(result.remainder, 0.5));
    }

    #[test]
    fn fractional_progress_is_carried() {
        let result = convert(25 * MINUTE_MS, &params(), 0.0);
        assert_eq!(result.stages, 2);
        assert!(close(result.remainder, 0.5));
    }

    #[test]
    fn remainder_stays_in_unit_interval() {
        for minutes in [0_u64, 1, 7, 9, 10, 59, 61, 119, 600, 1439, 1440, 100_000] {
            for prior in [0.0, 0.1, 0.5, 0.999] {
                let result = convert(minutes * MINUTE_MS, &params(), prior);
                assert!((0.0..1.0).contains(&result.remainder), "{minutes} {prior}");
                assert!(result.stages <= 7);
            }
        }
    }

    #[test]
    fn elapsed_is_clamped_to_max_offline_hours() {
        let p = ConversionParams {
            stages_per_hour: 0.25,
            max_offline_hours: 24.0,
            max_stages_per_application: 100,
        };
        let at_cap = convert(24 * HOUR_MS, &p, 0.0);
        let far_beyond = convert(24 * HOUR_MS * 100, &p, 0.0);
        assert_eq!(at_cap, far_beyond);
        assert_eq!(at_cap.stages, 6);
    }

    #[test]
    fn chained_conversions_match_single_conversion() {
        let first = convert(25 * MINUTE_MS, &params(), 0.0);
        let second = convert(35 * MINUTE_MS, &params(), first.remainder);
        let whole = convert(60 * MINUTE_MS, &params(), 0.0);
        assert_eq!(first.stages + second.stages, whole.stages);
        assert!(close(second.remainder, whole.remainder));
    }

    #[test]
    fn more_time_never_yields_fewer_stages() {
        let mut previous = 0;
        for minutes in 0..=300_u64 {
            let result = convert(minutes * MINUTE_MS, &params(), 0.0);
            assert!(result.stages >= previous);
            previous = result.stages;
        }
    }

    #[test]
    fn malformed_prior_remainder_is_ignored() {
        for prior in [f64::NAN, f64::INFINITY, -0.5, 1.0, 3.7] {
            let result = convert(25 * MINUTE_MS, &params(), prior);
            assert_eq!(result.stages, 2);
            assert!(close(result.remainder, 0.5));
        }
    }

    #[test]
    fn zero_cap_never_applies_stages() {
        let p = ConversionParams {
            max_stages_per_application: 0,
            ..params()
        };
        let result = convert(5 * HOUR_MS, &p, 0.0);
        assert_eq!(result.stages, 0);
        assert!(close(result.remainder, 0.0));
    }

    #[test]
    fn negative_rate_is_treated_as_zero() {
        let p = ConversionParams {
            stages_per_hour: -3.0,
            ..params()
        };
        let result = convert(5 * HOUR_MS, &p, 0.25);
        assert_eq!(result.stages, 0);
        assert!(close(result.remainder, 0.25));
    }
}
