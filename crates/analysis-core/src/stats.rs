//! Batch statistics over cross-sectional samples (one value per symbol).
//!
//! Everything here is order-independent: the same multiset of values gives the
//! same answer regardless of input order, which keeps sector aggregates stable.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by `n`).
///
/// The sector 3-sigma pass compares each symbol against its own peer group,
/// not a sample drawn from a larger population.
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Median of the finite values in `data`; `None` when there are none.
pub fn median(data: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Compute the z-score of `value` relative to `data` (population std-dev).
/// Returns 0.0 if data has insufficient variance.
pub fn z_score_of(value: f64, data: &[f64]) -> f64 {
    let sd = population_std_dev(data);
    if sd < f64::EPSILON {
        return 0.0;
    }
    (value - mean(data)) / sd
}

/// Percentile rank (0-100) of `value` within a universe that may contain gaps.
///
/// `None` entries are ignored. Ties use the average rank. A missing target,
/// an empty universe or a single-value universe all return the neutral 50.
pub fn percentile_rank(value: Option<f64>, universe: &[Option<f64>]) -> f64 {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return 50.0;
    };
    let valid: Vec<f64> = universe.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if valid.len() < 2 {
        return 50.0;
    }

    let below = valid.iter().filter(|&&v| v < value).count() as f64;
    let equal = valid.iter().filter(|&&v| v == value).count() as f64;
    let rank = if equal > 0.0 { below + (equal - 1.0) / 2.0 } else { below - 0.5 };

    (rank.max(0.0) / (valid.len() - 1) as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_even_and_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[f64::NAN, 7.0]), Some(7.0));
    }

    #[test]
    fn test_population_std_dev() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std_dev(&data), 2.0, epsilon = 1e-12);
        assert_eq!(population_std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_z_score() {
        let data = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let z = z_score_of(30.0, &data);
        assert!(z.abs() < 0.01); // mean value should have z ≈ 0
        assert_eq!(z_score_of(5.0, &[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_percentile_rank_bounds() {
        let values: Vec<Option<f64>> = (1..=10).map(|v| Some(v as f64)).collect();
        assert_relative_eq!(percentile_rank(Some(1.0), &values), 0.0);
        assert_relative_eq!(percentile_rank(Some(10.0), &values), 100.0);
    }

    #[test]
    fn test_percentile_rank_ignores_gaps_and_handles_neutral_cases() {
        let values = vec![Some(1.0), None, Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)];
        assert_relative_eq!(percentile_rank(Some(3.0), &values), 50.0);
        assert_eq!(percentile_rank(None, &values), 50.0);
        assert_eq!(percentile_rank(Some(5.0), &[Some(5.0)]), 50.0);
        assert_eq!(percentile_rank(Some(5.0), &[]), 50.0);
    }

    #[test]
    fn test_percentile_rank_ties_use_average_rank() {
        let values = vec![Some(1.0), Some(2.0), Some(2.0), Some(2.0), Some(5.0)];
        let rank = percentile_rank(Some(2.0), &values);
        assert_relative_eq!(rank, 50.0);
    }
}
