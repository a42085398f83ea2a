use analysis_core::normalize::{clamp, round_score};
use serde::{Deserialize, Serialize};
use technical_analysis::indicators::{latest_sma, realized_volatility};
use tracing::debug;

/// Market-wide risk appetite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketMode {
    /// Uptrend, calm or calming volatility and broad participation
    RiskOn,

    /// Downtrend, rising or steady volatility and narrow participation
    RiskOff,

    /// Anything in between
    Neutral,
}

impl MarketMode {
    pub fn name(&self) -> &'static str {
        match self {
            MarketMode::RiskOn => "RISK_ON",
            MarketMode::RiskOff => "RISK_OFF",
            MarketMode::Neutral => "NEUTRAL",
        }
    }
}

/// Inputs and intermediate signals behind a mode decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeFeatures {
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    /// Annualized realized volatility over the short window
    pub vol_short: Option<f64>,
    pub vol_long: Option<f64>,
    pub breadth: Option<f64>,

    /// +1 / -1 / 0
    pub trend_signal: i8,
    pub vol_signal: i8,
    pub breadth_signal: i8,

    /// Number of closes analyzed
    pub data_points: usize,
}

/// Mode detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeResult {
    pub label: MarketMode,
    /// 0..=100, 50 is neutral
    pub score: f64,
    /// 0..=1
    pub confidence: f64,
    pub features: ModeFeatures,
}

/// Rule-based market mode detector over a benchmark close series.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketModeDetector {
    pub short_ma: usize,
    pub long_ma: usize,
    pub short_vol_window: usize,
    pub long_vol_window: usize,

    /// Short vol above `vol_expansion * long vol` is risk-off
    pub vol_expansion: f64,
    /// Short vol below `vol_contraction * long vol` is risk-on
    pub vol_contraction: f64,

    pub breadth_high: f64,
    pub breadth_low: f64,

    /// Fewer closes than this costs confidence
    pub min_points: usize,
}

impl Default for MarketModeDetector {
    fn default() -> Self {
        Self {
            short_ma: 50,
            long_ma: 200,
            short_vol_window: 20,
            long_vol_window: 60,
            vol_expansion: 1.25,
            vol_contraction: 0.90,
            breadth_high: 0.6,
            breadth_low: 0.4,
            min_points: 120,
        }
    }
}

const TREND_WEIGHT: f64 = 20.0;
const BREADTH_WEIGHT: f64 = 15.0;
const VOL_WEIGHT: f64 = 15.0;

const MISSING_LONG_MA_PENALTY: f64 = 0.2;
const MISSING_BREADTH_PENALTY: f64 = 0.2;
const SHORT_HISTORY_PENALTY: f64 = 0.1;

impl MarketModeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the market from benchmark closes (oldest first) and an
    /// optional breadth ratio (share of advancing or above-trend members).
    pub fn detect_mode(&self, closes: &[f64], breadth: Option<f64>) -> ModeResult {
        let features = self.calculate_features(closes, breadth);
        let label = self.classify(&features);

        let score = 50.0
            + TREND_WEIGHT * features.trend_signal as f64
            + BREADTH_WEIGHT * features.breadth_signal as f64
            + VOL_WEIGHT * features.vol_signal as f64;

        let mut confidence = 1.0;
        if features.ma_long.is_none() {
            confidence -= MISSING_LONG_MA_PENALTY;
        }
        if features.breadth.is_none() {
            confidence -= MISSING_BREADTH_PENALTY;
        }
        if features.data_points < self.min_points {
            confidence -= SHORT_HISTORY_PENALTY;
        }

        let result = ModeResult {
            label,
            score: round_score(clamp(score, 0.0, 100.0), 1),
            confidence: round_score(clamp(confidence, 0.0, 1.0), 2),
            features,
        };

        debug!(
            label = result.label.name(),
            score = result.score,
            confidence = result.confidence,
            "Market mode detected"
        );
        result
    }

    fn calculate_features(&self, closes: &[f64], breadth: Option<f64>) -> ModeFeatures {
        let ma_short = latest_sma(closes, self.short_ma);
        let ma_long = latest_sma(closes, self.long_ma);
        let vol_short = realized_volatility(closes, self.short_vol_window);
        let vol_long = realized_volatility(closes, self.long_vol_window);
        let breadth = breadth.filter(|b| b.is_finite());

        ModeFeatures {
            ma_short,
            ma_long,
            vol_short,
            vol_long,
            breadth,
            trend_signal: Self::trend_signal(ma_short, ma_long),
            vol_signal: self.vol_signal(vol_short, vol_long),
            breadth_signal: self.breadth_signal(breadth),
            data_points: closes.len(),
        }
    }

    fn trend_signal(ma_short: Option<f64>, ma_long: Option<f64>) -> i8 {
        match (ma_short, ma_long) {
            (Some(s), Some(l)) if s > l => 1,
            (Some(s), Some(l)) if s < l => -1,
            _ => 0,
        }
    }

    fn vol_signal(&self, vol_short: Option<f64>, vol_long: Option<f64>) -> i8 {
        match (vol_short, vol_long) {
            (Some(s), Some(l)) if l > 0.0 => {
                if s > self.vol_expansion * l {
                    -1
                } else if s < self.vol_contraction * l {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn breadth_signal(&self, breadth: Option<f64>) -> i8 {
        match breadth {
            Some(b) if b >= self.breadth_high => 1,
            Some(b) if b <= self.breadth_low => -1,
            _ => 0,
        }
    }

    fn classify(&self, f: &ModeFeatures) -> MarketMode {
        if f.trend_signal == 1 && f.vol_signal >= 0 && f.breadth_signal == 1 {
            MarketMode::RiskOn
        } else if f.trend_signal == -1 && f.vol_signal <= 0 && f.breadth_signal == -1 {
            MarketMode::RiskOff
        } else {
            MarketMode::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Geometric drift with a fixed alternating wiggle, so volatility is stable.
    fn create_test_closes(count: usize, drift: f64, wiggle: f64) -> Vec<f64> {
        let mut price = 100.0;
        (0..count)
            .map(|i| {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                price *= 1.0 + drift + sign * wiggle;
                price
            })
            .collect()
    }

    #[test]
    fn test_risk_on() {
        let detector = MarketModeDetector::new();
        let closes = create_test_closes(260, 0.002, 0.005);

        let result = detector.detect_mode(&closes, Some(0.7));

        assert_eq!(result.label, MarketMode::RiskOn);
        assert_eq!(result.features.trend_signal, 1);
        assert_eq!(result.features.vol_signal, 0);
        assert_eq!(result.score, 85.0);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_risk_off_with_expanding_volatility() {
        let detector = MarketModeDetector::new();
        let mut closes = create_test_closes(240, -0.002, 0.004);
        let mut price = *closes.last().unwrap();
        for i in 0..20 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            price *= 1.0 - 0.002 + sign * 0.03;
            closes.push(price);
        }

        let result = detector.detect_mode(&closes, Some(0.3));

        assert_eq!(result.label, MarketMode::RiskOff);
        assert_eq!(result.features.trend_signal, -1);
        assert_eq!(result.features.vol_signal, -1);
        assert_eq!(result.features.breadth_signal, -1);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_mixed_signals_are_neutral() {
        let detector = MarketModeDetector::new();
        let closes = create_test_closes(260, 0.002, 0.005);

        let result = detector.detect_mode(&closes, Some(0.5));

        assert_eq!(result.label, MarketMode::Neutral);
        assert_eq!(result.score, 70.0);
    }

    #[test]
    fn test_insufficient_data_costs_confidence() {
        let detector = MarketModeDetector::new();
        let closes = create_test_closes(100, 0.001, 0.005);

        let result = detector.detect_mode(&closes, None);

        assert_eq!(result.label, MarketMode::Neutral);
        assert!(result.features.ma_long.is_none());
        assert_eq!(result.features.trend_signal, 0);
        // missing long MA, missing breadth, short history
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_empty_series() {
        let result = MarketModeDetector::new().detect_mode(&[], None);
        assert_eq!(result.label, MarketMode::Neutral);
        assert_eq!(result.score, 50.0);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_label_wire_format() {
        let json = serde_json::to_string(&MarketMode::RiskOff).unwrap();
        assert_eq!(json, "\"RISK_OFF\"");
    }
}
