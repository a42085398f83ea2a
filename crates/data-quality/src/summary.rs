use crate::scorer::{DataQualityAssessment, DataQualityConfig, QualityTier};
use analysis_core::normalize::round_score;
use serde::{Deserialize, Serialize};

/// Batch roll-up of per-symbol assessments, as written into the run record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualitySummary {
    pub symbols_evaluated: usize,
    pub avg_data_quality_score: f64,
    /// Percentages of symbols per tier, 0..=100
    pub pct_high: f64,
    pub pct_medium: f64,
    pub pct_low: f64,
    /// Symbols that fell back to a neutral default on at least one critical input
    #[serde(rename = "criticalFallbackCount")]
    pub critical_fallback_count: usize,
    /// Mean share of PE/PB/PS/EV-EBITDA present per symbol
    pub valuation_input_coverage: f64,
    /// Deprecated alias of `valuation_input_coverage`, always equal to it
    pub value_input_coverage: f64,
}

/// Summarise a batch. `valuation_coverage` holds one coverage fraction per symbol.
pub fn summarize_data_quality(
    assessments: &[DataQualityAssessment],
    valuation_coverage: &[f64],
    config: &DataQualityConfig,
) -> DataQualitySummary {
    let n = assessments.len();
    if n == 0 {
        return DataQualitySummary::default();
    }

    let pct = |tier: QualityTier| {
        let count = assessments
            .iter()
            .filter(|a| QualityTier::from_score(a.score, config) == tier)
            .count();
        round_score(count as f64 / n as f64 * 100.0, 1)
    };

    let avg = assessments.iter().map(|a| a.score).sum::<f64>() / n as f64;
    let coverage = if valuation_coverage.is_empty() {
        0.0
    } else {
        valuation_coverage.iter().sum::<f64>() / valuation_coverage.len() as f64
    };
    let coverage = round_score(coverage, 3);

    DataQualitySummary {
        symbols_evaluated: n,
        avg_data_quality_score: round_score(avg, 1),
        pct_high: pct(QualityTier::High),
        pct_medium: pct(QualityTier::Medium),
        pct_low: pct(QualityTier::Low),
        critical_fallback_count: assessments.iter().filter(|a| a.has_critical_fallback()).count(),
        valuation_input_coverage: coverage,
        value_input_coverage: coverage,
    }
}
