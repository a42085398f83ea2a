//! Momentum and trend sub-scores.

use analysis_core::normalize::{clamp, NEUTRAL_SCORE};

/// Default relative SMA gap at which trend strength saturates (5%).
pub const DEFAULT_TREND_TAU: f64 = 0.05;

/// Denominators smaller than this are treated as zero.
pub const DEFAULT_TREND_EPSILON: f64 = 1e-9;

/// Score a quarterly return with a soft cap.
///
/// Calibrated against the empirical distribution of quarterly returns:
///
/// | return `x`        | score                                  |
/// |-------------------|----------------------------------------|
/// | `x <= -1.0`       | 0                                      |
/// | `-1.0 < x <= 0.5` | `50 * (x + 1)` (0% -> 50, +50% -> 75)  |
/// | `0.5 < x < 0.75`  | quadratic ease-out from 75 to 100      |
/// | `x >= 0.75`       | 100                                    |
///
/// This is the only curve in the engine that reaches 100; range
/// normalization stops at 95.
pub fn momentum_soft_cap_score(x: f64) -> f64 {
    if x.is_nan() {
        return NEUTRAL_SCORE;
    }
    if x <= -1.0 {
        0.0
    } else if x <= 0.5 {
        50.0 * (x + 1.0)
    } else if x < 0.75 {
        let t = (x - 0.5) / 0.25;
        75.0 + 25.0 * (1.0 - (1.0 - t).powi(2))
    } else {
        100.0
    }
}

/// Binary trend check: 100 when the short average is above the long one, else 0.
pub fn sma_min_score(short: f64, long: f64) -> f64 {
    if !short.is_finite() || !long.is_finite() {
        return NEUTRAL_SCORE;
    }
    if short > long {
        100.0
    } else {
        0.0
    }
}

/// Graded trend strength: `50 + 50 * sign(short - long) * min(|short/long - 1| / tau, 1)`.
///
/// Returns 50 when `long` is near zero, `tau` is not positive or an input is not finite.
pub fn sma_strength_score(short: f64, long: f64, tau: f64, eps: f64) -> f64 {
    if !short.is_finite() || !long.is_finite() || !tau.is_finite() {
        return NEUTRAL_SCORE;
    }
    if long.abs() < eps || tau <= eps {
        return NEUTRAL_SCORE;
    }

    let relative = short / long - 1.0;
    let magnitude = (relative.abs() / tau).min(1.0);
    let direction = if relative > 0.0 {
        1.0
    } else if relative < 0.0 {
        -1.0
    } else {
        0.0
    };

    clamp(50.0 + 50.0 * direction * magnitude, 0.0, 100.0)
}

/// [`sma_strength_score`] with the default `tau` and epsilon.
pub fn sma_strength_default(short: f64, long: f64) -> f64 {
    sma_strength_score(short, long, DEFAULT_TREND_TAU, DEFAULT_TREND_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_momentum_anchor_points() {
        assert_eq!(momentum_soft_cap_score(-1.0), 0.0);
        assert_eq!(momentum_soft_cap_score(0.0), 50.0);
        assert_eq!(momentum_soft_cap_score(0.5), 75.0);
        assert_eq!(momentum_soft_cap_score(0.75), 100.0);
    }

    #[test]
    fn test_momentum_saturates_above_cap() {
        for x in [0.75, 0.8, 1.0, 2.5, 100.0, f64::INFINITY] {
            assert_eq!(momentum_soft_cap_score(x), 100.0, "x = {x}");
        }
        assert_eq!(momentum_soft_cap_score(-3.0), 0.0);
        assert_eq!(momentum_soft_cap_score(f64::NAN), 50.0);
    }

    #[test]
    fn test_momentum_is_non_decreasing() {
        let mut previous = momentum_soft_cap_score(-1.0);
        let mut x = -1.0;
        while x <= 0.75 {
            let score = momentum_soft_cap_score(x);
            assert!(score >= previous - 1e-12, "dropped at x = {x}");
            previous = score;
            x += 0.001;
        }
    }

    #[test]
    fn test_momentum_ease_is_continuous_at_breakpoints() {
        assert_relative_eq!(momentum_soft_cap_score(0.500_000_1), 75.0, epsilon = 1e-3);
        assert_relative_eq!(momentum_soft_cap_score(0.749_999_9), 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_sma_min_score() {
        assert_eq!(sma_min_score(105.0, 100.0), 100.0);
        assert_eq!(sma_min_score(95.0, 100.0), 0.0);
        assert_eq!(sma_min_score(100.0, 100.0), 0.0);
        assert_eq!(sma_min_score(f64::NAN, 100.0), 50.0);
    }

    #[test]
    fn test_sma_strength_reference_values() {
        assert_relative_eq!(sma_strength_score(105.0, 100.0, 0.05, 1e-9), 100.0, epsilon = 1e-9);
        assert_relative_eq!(sma_strength_score(102.5, 100.0, 0.05, 1e-9), 75.0, epsilon = 1e-6);
        assert_relative_eq!(sma_strength_score(97.5, 100.0, 0.05, 1e-9), 25.0, epsilon = 1e-6);
        assert_eq!(sma_strength_score(100.0, 100.0, 0.05, 1e-9), 50.0);
        assert_eq!(sma_strength_score(100.0, 100.0, 0.2, 1e-9), 50.0);
    }

    #[test]
    fn test_sma_strength_guards() {
        assert_eq!(sma_strength_score(100.0, 0.0, 0.05, 1e-9), 50.0);
        assert_eq!(sma_strength_score(100.0, 1e-12, 0.05, 1e-9), 50.0);
        assert_eq!(sma_strength_score(100.0, 90.0, 0.0, 1e-9), 50.0);
        assert_eq!(sma_strength_score(200.0, 100.0, 0.05, 1e-9), 100.0);
        assert_eq!(sma_strength_score(10.0, 100.0, 0.05, 1e-9), 0.0);
    }
}
