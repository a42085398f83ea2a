//! Generic scaling and clamping helpers shared by every pillar.
//!
//! Range normalization deliberately saturates at [`RANGE_SOFT_CAP`] (95), not 100.
//! Only the momentum curve in `technical-analysis` is allowed to reach 100.

use serde::{Deserialize, Serialize};

/// Score returned whenever an input is missing or indeterminate.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Ceiling of [`normalize_to_range`].
pub const RANGE_SOFT_CAP: f64 = 95.0;

const SPAN_EPSILON: f64 = 1e-12;

/// Input band for [`normalize_to_range`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: f64,
    pub high: f64,
}

impl ScoreRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Clamp `value` into `[min, max]`. NaN maps to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Map `value` from `[in_min, in_max]` onto `[out_min, out_max]`, clamping the output.
///
/// A degenerate input span returns the midpoint of the output range.
pub fn linear_scale(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    if span.abs() < SPAN_EPSILON || !value.is_finite() {
        return (out_min + out_max) / 2.0;
    }
    let t = (value - in_min) / span;
    let scaled = out_min + t * (out_max - out_min);
    clamp(scaled, out_min.min(out_max), out_min.max(out_max))
}

/// Like [`linear_scale`] but high inputs map to `out_min`.
pub fn inverse_linear_scale(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    linear_scale(value, in_min, in_max, out_max, out_min)
}

/// Normalize a raw metric onto 0..=95.
///
/// - `None`, NaN or infinite input: 50
/// - at/below `range.low`: 0, at/above `range.high`: 95, linear in between
/// - `inverted` flips the direction for lower-is-better metrics
pub fn normalize_to_range(value: Option<f64>, range: ScoreRange, inverted: bool) -> f64 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NEUTRAL_SCORE;
    };
    if range.high - range.low < SPAN_EPSILON {
        return NEUTRAL_SCORE;
    }

    let score = if v <= range.low {
        0.0
    } else if v >= range.high {
        RANGE_SOFT_CAP
    } else {
        (v - range.low) / (range.high - range.low) * RANGE_SOFT_CAP
    };

    if inverted {
        RANGE_SOFT_CAP - score
    } else {
        score
    }
}

/// Round to `decimals` places. Non-finite values round to 0.
pub fn round_score(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Round to one decimal place, the default precision for reported scores.
pub fn round1(value: f64) -> f64 {
    round_score(value, 1)
}
