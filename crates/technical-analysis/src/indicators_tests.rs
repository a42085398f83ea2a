#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use approx::assert_relative_eq;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    // Alternating +1% / -1% closes
    fn zigzag(len: usize) -> Vec<f64> {
        let mut closes = vec![100.0];
        for i in 1..len {
            let prev = closes[i - 1];
            closes.push(if i % 2 == 0 { prev * 0.99 } else { prev * 1.01 });
        }
        closes
    }

    #[test]
    fn test_latest_sma_uses_trailing_window() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(latest_sma(&data, 3).unwrap(), 4.0); // (3+4+5)/3
        assert_relative_eq!(latest_sma(&data, 5).unwrap(), 3.0);
        // 46.00 + 46.03 + 46.41 + 46.22 + 45.64
        assert_relative_eq!(latest_sma(&sample_prices(), 5).unwrap(), 46.06, epsilon = 1e-9);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        assert_eq!(latest_sma(&data, 5), None);
        assert_eq!(latest_sma(&data, 0), None);
    }

    #[test]
    fn test_simple_returns() {
        let returns = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
        assert!(simple_returns(&[0.0, 5.0]).is_empty());
    }

    #[test]
    fn test_realized_volatility_flat_series_is_zero() {
        let closes = vec![100.0; 30];
        assert_relative_eq!(realized_volatility(&closes, 20).unwrap(), 0.0);
    }

    #[test]
    fn test_realized_volatility_is_annualized() {
        let closes = zigzag(61);
        let vol = realized_volatility(&closes, 60).unwrap();
        // daily std-dev is roughly 1%, annualized ~ 0.01 * sqrt(252)
        assert!(vol > 0.14 && vol < 0.18, "vol = {vol}");
    }

    #[test]
    fn test_realized_volatility_needs_enough_points() {
        let closes = zigzag(20);
        assert_eq!(realized_volatility(&closes, 20), None);
        assert_eq!(realized_volatility(&closes, 1), None);
        assert!(realized_volatility(&closes, 19).is_some());
    }
}
