//! Sector-relative fair value.
//!
//! Up to three implied prices (EPS x median PE, BVPS x median PB,
//! revenue/share x median PS) are blended into a fair value bounded to a
//! multiple of the current price. The terse [`PriceTarget`] and the verbose
//! [`PriceTargetDiagnostics`] come out of the same pass. The diagnostics also
//! carry an advisory two-stage DCF value, see [`crate::dcf`].

use crate::config::PriceTargetConfig;
use crate::dcf::DcfEstimate;
use crate::sector_medians::{MedianSelection, ResolvedMedian};
use analysis_core::normalize::{clamp, round_score};
use analysis_core::{ConfidenceLevel, StockInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

const HIGH_CONFIDENCE_CUTOFF: f64 = 0.70;
const MEDIUM_CONFIDENCE_CUTOFF: f64 = 0.50;

/// Already-computed scores the confidence estimate draws on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreContext {
    pub total_score: f64,
    pub data_quality_score: f64,
    /// Strongest minus weakest pillar
    pub pillar_spread: f64,
    pub volatility_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTarget {
    pub current_price: f64,
    pub fair_value: f64,
    pub upside_pct: f64,
    pub target_buy: f64,
    pub target_sell: f64,
    pub confidence: ConfidenceLevel,
    pub requires_deep_analysis: bool,
    pub deep_analysis_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargetInputs {
    pub current_price: Option<f64>,
    pub eps: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub revenue_per_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationComponent {
    pub included: bool,
    /// Share of the fair value after re-weighting over included components
    pub weight: f64,
    pub value: Option<f64>,
    pub clamped: bool,
    pub reason: Option<String>,
}

impl ValuationComponent {
    fn excluded(reason: impl Into<String>) -> Self {
        Self {
            included: false,
            weight: 0.0,
            value: None,
            clamped: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDiagnostics {
    pub pe: ValuationComponent,
    pub pb: ValuationComponent,
    pub ps: ValuationComponent,
}

impl ComponentDiagnostics {
    fn iter(&self) -> impl Iterator<Item = &ValuationComponent> {
        [&self.pe, &self.pb, &self.ps].into_iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut ValuationComponent> {
        [&mut self.pe, &mut self.pb, &mut self.ps].into_iter()
    }

    pub fn included_count(&self) -> usize {
        self.iter().filter(|c| c.included).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueDiagnostics {
    pub raw: Option<f64>,
    pub bounded: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub was_clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDiagnostics {
    pub composite: f64,
    /// Tier before any fallback downgrade
    pub base: ConfidenceLevel,
    pub level: ConfidenceLevel,
    pub downgraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargetDiagnostics {
    pub inputs: PriceTargetInputs,
    pub medians: MedianSelection,
    pub components: ComponentDiagnostics,
    pub fair_value: FairValueDiagnostics,
    pub confidence: ConfidenceDiagnostics,
    /// Per-share DCF value; never blended into `fair_value`
    pub dcf_fair_value: Option<f64>,
    pub dcf: DcfEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargetOutcome {
    /// `None` without a positive current price or any usable component
    pub target: Option<PriceTarget>,
    pub diagnostics: PriceTargetDiagnostics,
}

fn positive_price(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn implied_price(
    basis: Option<f64>,
    basis_name: &str,
    median: &ResolvedMedian,
    weight: f64,
    price: Option<f64>,
    config: &PriceTargetConfig,
) -> ValuationComponent {
    let Some(basis) = basis.filter(|v| v.is_finite()) else {
        return ValuationComponent::excluded(format!("{basis_name}_missing"));
    };
    if basis <= 0.0 {
        return ValuationComponent::excluded(format!("{basis_name}_non_positive"));
    }
    if median.value <= 0.0 || !median.value.is_finite() {
        return ValuationComponent::excluded("median_non_positive");
    }
    if weight <= 0.0 {
        return ValuationComponent::excluded("zero_weight");
    }

    let implied = basis * median.value;
    let (value, clamped) = match price {
        Some(p) => {
            let bounded = clamp(implied, p * config.component_min_multiple, p * config.component_max_multiple);
            (bounded, bounded != implied)
        }
        None => (implied, false),
    };

    ValuationComponent {
        included: true,
        weight,
        value: Some(value),
        clamped,
        reason: None,
    }
}

/// Composite confidence in 0..=1 from the score context.
pub fn confidence_composite(ctx: &ScoreContext) -> f64 {
    let unit = |v: f64| clamp(v / 100.0, 0.0, 1.0);
    let c = 0.35 * unit(ctx.total_score)
        + 0.35 * unit(ctx.data_quality_score)
        + 0.15 * (1.0 - unit(ctx.pillar_spread))
        + 0.15 * unit(ctx.volatility_score);
    clamp(c, 0.0, 1.0)
}

fn confidence_tier(composite: f64) -> ConfidenceLevel {
    if composite >= HIGH_CONFIDENCE_CUTOFF {
        ConfidenceLevel::High
    } else if composite >= MEDIUM_CONFIDENCE_CUTOFF {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn buy_margin(level: ConfidenceLevel, config: &PriceTargetConfig) -> f64 {
    match level {
        ConfidenceLevel::High => config.buy_margins.high,
        ConfidenceLevel::Medium => config.buy_margins.medium,
        ConfidenceLevel::Low => config.buy_margins.low,
    }
}

/// Estimate fair value and buy/sell targets for one stock.
pub fn calculate_price_targets(
    stock: &StockInput,
    selection: &MedianSelection,
    ctx: &ScoreContext,
    config: &PriceTargetConfig,
) -> PriceTargetOutcome {
    let f = &stock.fundamentals;
    let price = positive_price(stock.technical.current_price);
    let inputs = PriceTargetInputs {
        current_price: stock.technical.current_price.filter(|v| v.is_finite()),
        eps: f.eps.filter(|v| v.is_finite()),
        book_value_per_share: f.resolved_book_value_per_share(),
        revenue_per_share: f.resolved_revenue_per_share(),
    };

    let weights = &config.component_weights;
    let mut components = ComponentDiagnostics {
        pe: implied_price(inputs.eps, "eps", &selection.pe, weights.pe, price, config),
        pb: implied_price(
            inputs.book_value_per_share,
            "book_value_per_share",
            &selection.pb,
            weights.pb,
            price,
            config,
        ),
        ps: implied_price(
            inputs.revenue_per_share,
            "revenue_per_share",
            &selection.ps,
            weights.ps,
            price,
            config,
        ),
    };

    let total_weight: f64 = components.iter().filter(|c| c.included).map(|c| c.weight).sum();
    for c in components.iter_mut().filter(|c| c.included) {
        c.weight /= total_weight;
    }
    let raw = if total_weight > 0.0 {
        Some(
            components
                .iter()
                .filter_map(|c| c.value.map(|v| v * c.weight))
                .sum::<f64>(),
        )
    } else {
        None
    };

    let (min, max) = match price {
        Some(p) => (
            Some(p * config.fair_value_min_multiple),
            Some(p * config.fair_value_max_multiple),
        ),
        None => (None, None),
    };
    let bounded = match (raw, min, max) {
        (Some(r), Some(lo), Some(hi)) => Some(clamp(r, lo, hi)),
        _ => None,
    };
    let fair_value = FairValueDiagnostics {
        raw,
        bounded,
        min,
        max,
        was_clamped: matches!((raw, bounded), (Some(r), Some(b)) if r != b),
    };

    let composite = confidence_composite(ctx);
    let base = confidence_tier(composite);
    let level = if selection.is_fallback() { base.downgrade() } else { base };
    let confidence = ConfidenceDiagnostics {
        composite: round_score(composite, 4),
        base,
        level,
        downgraded: level != base,
    };

    let target = match (price, bounded) {
        (Some(p), Some(fair)) => {
            let upside_pct = round_score((fair / p - 1.0) * 100.0, 1);
            let mut reasons = Vec::new();
            if components.included_count() < config.min_components {
                reasons.push("insufficient_components".to_string());
            }
            if level == ConfidenceLevel::Low {
                reasons.push("low_confidence".to_string());
            }
            if upside_pct > config.max_realistic_upside_pct || upside_pct < config.min_realistic_upside_pct {
                reasons.push("unrealistic_upside".to_string());
            }
            if fair_value.was_clamped {
                reasons.push("fair_value_clamped".to_string());
            }

            Some(PriceTarget {
                current_price: p,
                fair_value: round_score(fair, 2),
                upside_pct,
                target_buy: round_score(fair * (1.0 - buy_margin(level, config)), 2),
                target_sell: round_score(fair * (1.0 + config.sell_premium), 2),
                confidence: level,
                requires_deep_analysis: !reasons.is_empty(),
                deep_analysis_reasons: reasons,
            })
        }
        _ => None,
    };

    let dcf = DcfEstimate::from_stock(stock, &config.dcf);

    debug!(
        symbol = %stock.symbol,
        components = components.included_count(),
        fair_value = ?bounded,
        dcf_fair_value = ?dcf.fair_value,
        confidence = level.to_label(),
        "Price target computed"
    );

    PriceTargetOutcome {
        target,
        diagnostics: PriceTargetDiagnostics {
            inputs,
            medians: selection.clone(),
            components,
            fair_value,
            confidence,
            dcf_fair_value: dcf.fair_value,
            dcf,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector_medians::{
        calculate_sector_medians, get_sector_medians_for_stock, FallbackReason, MedianSource,
    };
    use crate::dcf::DcfExclusion;
    use approx::assert_relative_eq;

    fn priced_stock(symbol: &str) -> StockInput {
        let mut s = StockInput::new(symbol);
        s.sector = Some("Industrials".to_string());
        s.technical.current_price = Some(100.0);
        s.fundamentals.eps = Some(5.0);
        s.fundamentals.book_value_per_share = Some(20.0);
        s.fundamentals.revenue_per_share = Some(40.0);
        s.fundamentals.pe_ratio = Some(20.0);
        s.fundamentals.pb_ratio = Some(3.0);
        s.fundamentals.ps_ratio = Some(2.5);
        s
    }

    fn strong_context() -> ScoreContext {
        ScoreContext {
            total_score: 80.0,
            data_quality_score: 90.0,
            pillar_spread: 20.0,
            volatility_score: 80.0,
        }
    }

    fn batch() -> Vec<StockInput> {
        (0..5).map(|i| priced_stock(&format!("S{i}"))).collect()
    }

    #[test]
    fn test_fair_value_blends_components() {
        let stocks = batch();
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        let outcome = calculate_price_targets(&stocks[0], &selection, &strong_context(), &config);

        // 0.5 * 100 + 0.25 * 60 + 0.25 * 100
        let target = outcome.target.unwrap();
        assert_relative_eq!(target.fair_value, 90.0);
        assert_relative_eq!(target.upside_pct, -10.0);
        assert_eq!(target.confidence, ConfidenceLevel::High);
        assert_relative_eq!(target.target_buy, 81.0);
        assert_relative_eq!(target.target_sell, 94.5);
        assert!(!target.requires_deep_analysis);
        assert_eq!(outcome.diagnostics.components.included_count(), 3);
        assert!(!outcome.diagnostics.fair_value.was_clamped);
    }

    #[test]
    fn test_global_fallback_downgrades_exactly_one_tier() {
        let stocks = batch();
        let sector_config = PriceTargetConfig::default();
        let fallback_config = PriceTargetConfig {
            min_sector_sample_size: 10,
            ..Default::default()
        };
        let ctx = strong_context();

        let set = calculate_sector_medians(&stocks, &sector_config);
        let sector = get_sector_medians_for_stock(&stocks[0], &set, &sector_config);
        let baseline = calculate_price_targets(&stocks[0], &sector, &ctx, &sector_config);

        let fallback = get_sector_medians_for_stock(&stocks[0], &set, &fallback_config);
        let outcome = calculate_price_targets(&stocks[0], &fallback, &ctx, &fallback_config);

        let diag = &outcome.diagnostics;
        assert_eq!(diag.medians.source, MedianSource::Global);
        assert_eq!(diag.medians.fallback_reason, Some(FallbackReason::SectorSampleTooSmall));
        assert!(diag.confidence.downgraded);

        let before = baseline.target.unwrap().confidence;
        let after = outcome.target.unwrap().confidence;
        assert_eq!(before, ConfidenceLevel::High);
        assert_eq!(after, before.downgrade());
    }

    #[test]
    fn test_missing_bases_are_excluded_with_reasons() {
        let mut stock = priced_stock("LOSS");
        stock.fundamentals.eps = Some(-2.0);
        stock.fundamentals.book_value_per_share = None;
        let stocks = vec![stock.clone()];
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stock, &set, &config);
        let outcome = calculate_price_targets(&stock, &selection, &strong_context(), &config);

        let components = &outcome.diagnostics.components;
        assert_eq!(components.pe.reason.as_deref(), Some("eps_non_positive"));
        assert_eq!(components.pb.reason.as_deref(), Some("book_value_per_share_missing"));
        assert!(components.ps.included);
        assert_relative_eq!(components.ps.weight, 1.0);

        let target = outcome.target.unwrap();
        assert!(target.requires_deep_analysis);
        assert!(target.deep_analysis_reasons.contains(&"insufficient_components".to_string()));
    }

    #[test]
    fn test_extreme_fair_value_is_clamped() {
        let mut stock = priced_stock("MOON");
        stock.technical.current_price = Some(10.0);
        let stocks = vec![stock.clone()];
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stock, &set, &config);
        let outcome = calculate_price_targets(&stock, &selection, &strong_context(), &config);

        let fair = &outcome.diagnostics.fair_value;
        assert!(fair.was_clamped);
        assert_eq!(fair.bounded, Some(30.0));
        let target = outcome.target.unwrap();
        assert_relative_eq!(target.upside_pct, 200.0);
        assert!(target.deep_analysis_reasons.contains(&"unrealistic_upside".to_string()));
        assert!(target.deep_analysis_reasons.contains(&"fair_value_clamped".to_string()));
    }

    #[test]
    fn test_no_price_means_no_target_but_diagnostics() {
        let mut stock = priced_stock("NOPX");
        stock.technical.current_price = None;
        let stocks = vec![stock.clone()];
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stock, &set, &config);
        let outcome = calculate_price_targets(&stock, &selection, &strong_context(), &config);

        assert!(outcome.target.is_none());
        assert!(outcome.diagnostics.fair_value.raw.is_some());
        assert_eq!(outcome.diagnostics.fair_value.bounded, None);
    }

    #[test]
    fn test_confidence_composite() {
        assert_relative_eq!(confidence_composite(&strong_context()), 0.835, epsilon = 1e-9);
        let weak = ScoreContext {
            total_score: 30.0,
            data_quality_score: 40.0,
            pillar_spread: 70.0,
            volatility_score: 20.0,
        };
        assert_eq!(confidence_tier(confidence_composite(&weak)), ConfidenceLevel::Low);
    }

    #[test]
    fn test_weak_context_requires_deep_analysis() {
        let stocks = batch();
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        let weak = ScoreContext {
            total_score: 30.0,
            data_quality_score: 40.0,
            pillar_spread: 70.0,
            volatility_score: 20.0,
        };
        let outcome = calculate_price_targets(&stocks[0], &selection, &weak, &config);

        assert_eq!(outcome.diagnostics.medians.source, MedianSource::Sector);
        assert!(!outcome.diagnostics.confidence.downgraded);
        let target = outcome.target.unwrap();
        assert_eq!(target.confidence, ConfidenceLevel::Low);
        assert!(target.requires_deep_analysis);
        assert_eq!(target.deep_analysis_reasons, vec!["low_confidence".to_string()]);
        assert_relative_eq!(target.target_buy, 67.5); // 90 x (1 - 0.25)
    }

    #[test]
    fn test_blank_sector_is_a_downgraded_fallback() {
        let mut stocks = batch();
        stocks[0].sector = Some("   ".to_string());
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        let outcome = calculate_price_targets(&stocks[0], &selection, &strong_context(), &config);

        let diag = &outcome.diagnostics;
        assert_eq!(diag.medians.source, MedianSource::Global);
        assert_eq!(diag.medians.fallback_reason, Some(FallbackReason::MissingSector));
        assert_eq!(diag.confidence.base, ConfidenceLevel::High);
        assert!(diag.confidence.downgraded);
        assert_eq!(outcome.target.unwrap().confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_dcf_is_reported_but_not_blended() {
        let mut stock = priced_stock("DCF");
        stock.fundamentals.free_cash_flow_history = vec![80.0, 90.0, 100.0];
        stock.fundamentals.shares_outstanding = Some(10.0);
        stock.technical.beta = Some(1.2);
        let mut stocks = batch();
        stocks[0] = stock.clone();
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stock, &set, &config);
        let outcome = calculate_price_targets(&stock, &selection, &strong_context(), &config);

        let diag = &outcome.diagnostics;
        assert!(diag.dcf.included);
        assert_eq!(diag.dcf_fair_value, Some(251.26));
        assert_eq!(diag.dcf.upside_pct, Some(151.3));
        // multiples-only fair value is unchanged
        assert_relative_eq!(outcome.target.unwrap().fair_value, 90.0);
    }

    #[test]
    fn test_dcf_without_inputs_is_excluded() {
        let stocks = batch();
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        let outcome = calculate_price_targets(&stocks[0], &selection, &strong_context(), &config);

        let diag = &outcome.diagnostics;
        assert!(!diag.dcf.included);
        assert_eq!(diag.dcf_fair_value, None);
        assert_eq!(diag.dcf.reason, Some(DcfExclusion::FreeCashFlowMissing));
        assert!(outcome.target.is_some());
    }

    #[test]
    fn test_thin_pe_coverage_downgrades_confidence() {
        let mut stocks = batch();
        for s in stocks.iter_mut().skip(1) {
            s.fundamentals.pe_ratio = None;
        }
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        assert_eq!(set.sectors["Industrials"].sample_size, 5);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        let outcome = calculate_price_targets(&stocks[0], &selection, &strong_context(), &config);

        let diag = &outcome.diagnostics;
        assert_eq!(diag.medians.fallback_reason, Some(FallbackReason::SectorSampleTooSmall));
        assert!(diag.confidence.downgraded);
        assert_eq!(outcome.target.unwrap().confidence, ConfidenceLevel::Medium);
    }
}
