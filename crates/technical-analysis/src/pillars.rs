//! Technical and risk pillars built from precomputed price metrics.

use crate::momentum::{momentum_soft_cap_score, sma_strength_default};
use analysis_core::normalize::{normalize_to_range, ScoreRange, NEUTRAL_SCORE};
use analysis_core::{PillarComponent, PillarScore, TechnicalMetrics};

const MOMENTUM_WEIGHT: f64 = 0.45;
const TREND_WEIGHT: f64 = 0.35;
const RISK_ADJUSTED_WEIGHT: f64 = 0.20;

const VOLATILITY_WEIGHT: f64 = 0.50;
const BETA_WEIGHT: f64 = 0.30;
const DRAWDOWN_WEIGHT: f64 = 0.20;

/// 12-month return per unit of annual volatility
const RISK_ADJUSTED_RANGE: ScoreRange = ScoreRange::new(-1.0, 2.0);
const VOLATILITY_RANGE: ScoreRange = ScoreRange::new(0.15, 0.60);
const BETA_RANGE: ScoreRange = ScoreRange::new(0.5, 2.0);
const DRAWDOWN_RANGE: ScoreRange = ScoreRange::new(0.10, 0.60);

pub const VOLATILITY_COMPONENT: &str = "volatility";

/// Technical pillar: momentum, trend and volatility-adjusted return.
///
/// Missing momentum or trend inputs count as the neutral 50; a missing
/// risk-adjusted return is left out of the average.
pub fn technical_pillar(metrics: &TechnicalMetrics) -> PillarScore {
    let momentum =
        PillarComponent::scored("momentum_3m", metrics.return_3m, MOMENTUM_WEIGHT, momentum_soft_cap_score)
            .or_neutral();

    let risk_adjusted = PillarComponent::scored(
        "risk_adjusted_return_12m",
        risk_adjusted_return(metrics),
        RISK_ADJUSTED_WEIGHT,
        |v| normalize_to_range(Some(v), RISK_ADJUSTED_RANGE, false),
    );

    PillarScore::from_components(vec![momentum, trend_component(metrics), risk_adjusted])
}

/// Risk pillar: lower volatility, beta and drawdown score higher.
pub fn risk_pillar(metrics: &TechnicalMetrics) -> PillarScore {
    let inverted = |range: ScoreRange| move |v: f64| normalize_to_range(Some(v), range, true);

    PillarScore::from_components(vec![
        PillarComponent::scored(
            VOLATILITY_COMPONENT,
            metrics.annual_volatility(),
            VOLATILITY_WEIGHT,
            inverted(VOLATILITY_RANGE),
        ),
        PillarComponent::scored("beta", metrics.beta, BETA_WEIGHT, inverted(BETA_RANGE)),
        PillarComponent::scored(
            "max_drawdown",
            metrics.max_drawdown.map(f64::abs),
            DRAWDOWN_WEIGHT,
            inverted(DRAWDOWN_RANGE),
        ),
    ])
}

/// Volatility component of a risk pillar, or 50 when volatility was missing.
pub fn volatility_score(risk: &PillarScore) -> f64 {
    risk.component(VOLATILITY_COMPONENT)
        .filter(|c| c.included)
        .map(|c| c.score)
        .unwrap_or(NEUTRAL_SCORE)
}

fn risk_adjusted_return(metrics: &TechnicalMetrics) -> Option<f64> {
    match (metrics.return_12m, metrics.annual_volatility()) {
        (Some(ret), Some(vol)) if vol > 1e-9 && ret.is_finite() => Some(ret / vol),
        _ => None,
    }
}

/// SMA50 vs SMA200 when both exist, else price vs SMA200, else neutral.
fn trend_component(metrics: &TechnicalMetrics) -> PillarComponent {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let pair = match (finite(metrics.sma_50), finite(metrics.sma_200), finite(metrics.current_price)) {
        (Some(short), Some(long), _) => Some(("trend_sma50_sma200", short, long)),
        (None, Some(long), Some(price)) => Some(("trend_price_sma200", price, long)),
        _ => None,
    };

    match pair {
        Some((name, short, long)) => {
            PillarComponent::scored(name, Some(short), TREND_WEIGHT, |s| sma_strength_default(s, long))
        }
        None => PillarComponent::excluded("trend", TREND_WEIGHT).or_neutral(),
    }
}
