//! Valuation and quality pillars.

use crate::piotroski::PiotroskiResult;
use analysis_core::normalize::{normalize_to_range, ScoreRange};
use analysis_core::{Fundamentals, PillarComponent, PillarScore};

const PE_RANGE: ScoreRange = ScoreRange::new(5.0, 40.0);
const PB_RANGE: ScoreRange = ScoreRange::new(0.5, 8.0);
const PS_RANGE: ScoreRange = ScoreRange::new(0.5, 10.0);
const EV_EBITDA_RANGE: ScoreRange = ScoreRange::new(4.0, 25.0);
const FCF_YIELD_RANGE: ScoreRange = ScoreRange::new(0.0, 0.10);
const PE_RELATIVE_RANGE: ScoreRange = ScoreRange::new(0.5, 2.0);

const ROE_RANGE: ScoreRange = ScoreRange::new(0.0, 0.25);
const ROA_RANGE: ScoreRange = ScoreRange::new(0.0, 0.12);
const GROSS_MARGIN_RANGE: ScoreRange = ScoreRange::new(0.10, 0.60);
const OPERATING_MARGIN_RANGE: ScoreRange = ScoreRange::new(0.0, 0.30);
const DEBT_TO_EQUITY_RANGE: ScoreRange = ScoreRange::new(0.0, 2.5);
const CURRENT_RATIO_RANGE: ScoreRange = ScoreRange::new(0.8, 2.5);

/// Lower-is-better multiple. A non-positive multiple (losses, negative book) scores 0.
fn cheapness(range: ScoreRange) -> impl Fn(f64) -> f64 {
    move |v| {
        if v <= 0.0 {
            0.0
        } else {
            normalize_to_range(Some(v), range, true)
        }
    }
}

fn higher_is_better(range: ScoreRange) -> impl Fn(f64) -> f64 {
    move |v| normalize_to_range(Some(v), range, false)
}

/// PE divided by the chosen sector median PE, when both are positive.
pub fn relative_pe(f: &Fundamentals, median_pe: Option<f64>) -> Option<f64> {
    match (f.pe_ratio.filter(|v| v.is_finite()), median_pe) {
        (Some(pe), Some(median)) if pe > 0.0 && median > 0.0 => Some(pe / median),
        _ => None,
    }
}

/// Score how cheap the stock is, absolutely and against its sector median PE.
pub fn valuation_pillar(f: &Fundamentals, median_pe: Option<f64>) -> PillarScore {
    PillarScore::from_components(vec![
        PillarComponent::scored("pe_ratio", f.pe_ratio, 0.30, cheapness(PE_RANGE)),
        PillarComponent::scored("pb_ratio", f.pb_ratio, 0.15, cheapness(PB_RANGE)),
        PillarComponent::scored("ps_ratio", f.ps_ratio, 0.15, cheapness(PS_RANGE)),
        PillarComponent::scored("ev_ebitda", f.ev_ebitda, 0.20, cheapness(EV_EBITDA_RANGE)),
        PillarComponent::scored("fcf_yield", f.fcf_yield(), 0.10, higher_is_better(FCF_YIELD_RANGE)),
        PillarComponent::scored("pe_vs_sector", relative_pe(f, median_pe), 0.10, |v| {
            normalize_to_range(Some(v), PE_RELATIVE_RANGE, true)
        }),
    ])
}

/// Profitability, balance-sheet strength and the Piotroski checklist.
pub fn quality_pillar(f: &Fundamentals, piotroski: &PiotroskiResult) -> PillarScore {
    PillarScore::from_components(vec![
        PillarComponent::scored("roe", f.roe, 0.20, higher_is_better(ROE_RANGE)),
        PillarComponent::scored("roa", f.roa, 0.10, higher_is_better(ROA_RANGE)),
        PillarComponent::scored("gross_margin", f.gross_margin, 0.15, higher_is_better(GROSS_MARGIN_RANGE)),
        PillarComponent::scored(
            "operating_margin",
            f.operating_margin,
            0.15,
            higher_is_better(OPERATING_MARGIN_RANGE),
        ),
        // negative D/E means negative equity
        PillarComponent::scored("debt_to_equity", f.debt_to_equity, 0.15, |v| {
            if v < 0.0 {
                0.0
            } else {
                normalize_to_range(Some(v), DEBT_TO_EQUITY_RANGE, true)
            }
        }),
        PillarComponent::scored("current_ratio", f.current_ratio, 0.10, higher_is_better(CURRENT_RATIO_RANGE)),
        PillarComponent::scored("piotroski", piotroski.ratio(), 0.15, |r| r * 100.0),
    ])
}
