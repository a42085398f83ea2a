//! Per-symbol scoring: pillars, total, data quality and price target.

use crate::config::{PillarWeights, ScoringConfig};
use analysis_core::normalize::{clamp, round1};
use analysis_core::{PillarEvidence, PillarScore, Scored, StockInput};
use data_quality::{assess_stock, DataQualityAssessment};
use fundamental_analysis::{
    calculate_piotroski, calculate_price_targets, get_sector_medians_for_stock, quality_pillar, red_flags,
    valuation_pillar, OutlierReport, PiotroskiResult, PriceTarget, PriceTargetDiagnostics, ScoreContext,
    SectorMedianSet,
};
use serde::{Deserialize, Serialize};
use technical_analysis::{risk_pillar, technical_pillar, volatility_score};
use tracing::debug;

/// Batch-wide aggregates computed once over the complete batch (phase 1) and
/// shared read-only by every per-symbol call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchContext {
    pub medians: SectorMedianSet,
    pub outliers: OutlierReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub valuation: PillarScore,
    pub quality: PillarScore,
    pub technical: PillarScore,
    pub risk: PillarScore,
    pub piotroski: PiotroskiResult,
    /// Normalised weights the total was computed with
    pub weights: PillarWeights,
    /// Rank of the valuation pillar within the batch, 0..=100 (informational)
    pub valuation_percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolScore {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    pub evidence: PillarEvidence,
    pub data_quality: DataQualityAssessment,
    /// `None` in scan-only mode, or when no target could be estimated
    pub price_target: Option<PriceTarget>,
    /// `None` only in scan-only mode
    pub price_target_diagnostics: Option<PriceTargetDiagnostics>,
    pub red_flags: Vec<String>,
    pub outlier_flags: Vec<String>,
    #[serde(rename = "isScanOnly")]
    pub is_scan_only: bool,
}

impl Scored for SymbolScore {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn total_score(&self) -> f64 {
        self.total_score
    }
}

/// Weighted total of the four pillars, in 0..=100.
pub fn total_score(evidence: &PillarEvidence, weights: &PillarWeights) -> f64 {
    let total = evidence.valuation * weights.valuation
        + evidence.quality * weights.quality
        + evidence.technical * weights.technical
        + evidence.risk * weights.risk;
    round1(clamp(total, 0.0, 100.0))
}

/// Score one symbol against the batch context.
///
/// `weights` must already be normalised. With `scan_only` the price target
/// and its diagnostics are both left empty.
pub fn score_symbol(
    stock: &StockInput,
    batch: &BatchContext,
    config: &ScoringConfig,
    weights: &PillarWeights,
    scan_only: bool,
) -> SymbolScore {
    let f = &stock.fundamentals;
    let selection = get_sector_medians_for_stock(stock, &batch.medians, &config.price_target);

    let piotroski = calculate_piotroski(f.current_period.as_ref(), f.prior_period.as_ref());
    let valuation = valuation_pillar(f, Some(selection.pe.value));
    let quality = quality_pillar(f, &piotroski);
    let technical = technical_pillar(&stock.technical);
    let risk = risk_pillar(&stock.technical);

    let evidence = PillarEvidence {
        valuation: valuation.score,
        quality: quality.score,
        technical: technical.score,
        risk: risk.score,
    };
    let total = total_score(&evidence, weights);
    let data_quality = assess_stock(stock, &config.data_quality);

    let (price_target, price_target_diagnostics) = if scan_only {
        (None, None)
    } else {
        let ctx = ScoreContext {
            total_score: total,
            data_quality_score: data_quality.score,
            pillar_spread: evidence.spread(),
            volatility_score: volatility_score(&risk),
        };
        let outcome = calculate_price_targets(stock, &selection, &ctx, &config.price_target);
        (outcome.target, Some(outcome.diagnostics))
    };

    debug!(
        symbol = %stock.symbol,
        total,
        valuation = evidence.valuation,
        quality = evidence.quality,
        technical = evidence.technical,
        risk = evidence.risk,
        data_quality = data_quality.score,
        "Symbol scored"
    );

    SymbolScore {
        symbol: stock.symbol.clone(),
        name: stock.name.clone(),
        sector: stock.sector_key().map(str::to_string),
        total_score: total,
        breakdown: ScoreBreakdown {
            valuation,
            quality,
            technical,
            risk,
            piotroski,
            weights: *weights,
            valuation_percentile: 50.0,
        },
        evidence,
        data_quality,
        price_target,
        price_target_diagnostics,
        red_flags: red_flags(f),
        outlier_flags: batch.outliers.flags_for(&stock.symbol).to_vec(),
        is_scan_only: scan_only,
    }
}
