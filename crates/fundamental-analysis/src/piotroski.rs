//! Piotroski F-score over two fiscal periods.
//!
//! Each of the nine signals is computed independently. A signal whose inputs
//! are missing is left out of both the score and `max_score`, so a company
//! with sparse filings is scored out of the signals that could be checked
//! rather than penalised for the gaps.

use analysis_core::FinancialPeriod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiotroskiSignalKind {
    PositiveRoa,
    PositiveOperatingCashFlow,
    ImprovingRoa,
    CashFlowExceedsIncome,
    LowerLeverage,
    ImprovingLiquidity,
    NoDilution,
    ImprovingGrossMargin,
    ImprovingAssetTurnover,
}

impl PiotroskiSignalKind {
    pub const ALL: [PiotroskiSignalKind; 9] = [
        PiotroskiSignalKind::PositiveRoa,
        PiotroskiSignalKind::PositiveOperatingCashFlow,
        PiotroskiSignalKind::ImprovingRoa,
        PiotroskiSignalKind::CashFlowExceedsIncome,
        PiotroskiSignalKind::LowerLeverage,
        PiotroskiSignalKind::ImprovingLiquidity,
        PiotroskiSignalKind::NoDilution,
        PiotroskiSignalKind::ImprovingGrossMargin,
        PiotroskiSignalKind::ImprovingAssetTurnover,
    ];
}

/// One signal. `passed` is `None` when the signal could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiotroskiSignal {
    pub signal: PiotroskiSignalKind,
    pub passed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiotroskiResult {
    pub score: u8,
    pub max_score: u8,
    pub signals: Vec<PiotroskiSignal>,
}

impl PiotroskiResult {
    /// `score / max_score`, or `None` when no signal was computable.
    pub fn ratio(&self) -> Option<f64> {
        if self.max_score >= 1 {
            Some(self.score as f64 / self.max_score as f64)
        } else {
            None
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (finite(numerator), finite(denominator)) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// Net income / total assets. Equity plays no part, so negative equity does not block it.
fn return_on_assets(p: &FinancialPeriod) -> Option<f64> {
    ratio(p.net_income, p.total_assets)
}

fn leverage(p: &FinancialPeriod) -> Option<f64> {
    ratio(p.long_term_debt, p.total_assets)
}

fn current_ratio(p: &FinancialPeriod) -> Option<f64> {
    ratio(p.current_assets, p.current_liabilities)
}

fn gross_margin(p: &FinancialPeriod) -> Option<f64> {
    ratio(p.gross_profit, p.revenue)
}

fn asset_turnover(p: &FinancialPeriod) -> Option<f64> {
    ratio(p.revenue, p.total_assets)
}

fn improved(current: Option<f64>, prior: Option<f64>) -> Option<bool> {
    match (current, prior) {
        (Some(c), Some(p)) => Some(c > p),
        _ => None,
    }
}

fn evaluate(
    signal: PiotroskiSignalKind,
    current: Option<&FinancialPeriod>,
    prior: Option<&FinancialPeriod>,
) -> Option<bool> {
    use PiotroskiSignalKind::*;

    let cur = current?;
    match signal {
        PositiveRoa => return_on_assets(cur).map(|roa| roa > 0.0),
        PositiveOperatingCashFlow => finite(cur.operating_cash_flow).map(|cfo| cfo > 0.0),
        CashFlowExceedsIncome => {
            // Only meaningful when assets are known, like the ROA signal it is compared to.
            return_on_assets(cur)?;
            match (finite(cur.operating_cash_flow), finite(cur.net_income)) {
                (Some(cfo), Some(ni)) => Some(cfo > ni),
                _ => None,
            }
        }
        ImprovingRoa => improved(return_on_assets(cur), return_on_assets(prior?)),
        LowerLeverage => match (leverage(cur), leverage(prior?)) {
            (Some(c), Some(p)) => Some(c <= p),
            _ => None,
        },
        ImprovingLiquidity => improved(current_ratio(cur), current_ratio(prior?)),
        NoDilution => match (finite(cur.shares_outstanding), finite(prior?.shares_outstanding)) {
            (Some(c), Some(p)) => Some(c <= p),
            _ => None,
        },
        ImprovingGrossMargin => improved(gross_margin(cur), gross_margin(prior?)),
        ImprovingAssetTurnover => improved(asset_turnover(cur), asset_turnover(prior?)),
    }
}

/// Score the nine signals from the current and prior fiscal periods.
pub fn calculate_piotroski(current: Option<&FinancialPeriod>, prior: Option<&FinancialPeriod>) -> PiotroskiResult {
    let signals: Vec<PiotroskiSignal> = PiotroskiSignalKind::ALL
        .iter()
        .map(|&signal| PiotroskiSignal {
            signal,
            passed: evaluate(signal, current, prior),
        })
        .collect();

    let max_score = signals.iter().filter(|s| s.passed.is_some()).count() as u8;
    let score = signals.iter().filter(|s| s.passed == Some(true)).count() as u8;

    PiotroskiResult {
        score,
        max_score,
        signals,
    }
}
