use statrs::statistics::Statistics;

/// Trading days used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Most recent SMA value, `None` if there are fewer than `period` points.
pub fn latest_sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let window = &data[data.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Period-over-period simple returns. Steps from a non-positive price are skipped.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1].is_finite())
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Annualized realized volatility of the last `window` daily returns.
///
/// Needs at least `window + 1` closes and a window of two or more returns.
pub fn realized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || closes.len() < window + 1 {
        return None;
    }
    let returns = simple_returns(&closes[closes.len() - window - 1..]);
    if returns.len() < 2 {
        return None;
    }
    let daily = returns.iter().std_dev();
    if !daily.is_finite() {
        return None;
    }
    Some(daily * TRADING_DAYS_PER_YEAR.sqrt())
}
