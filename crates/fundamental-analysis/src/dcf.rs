//! Two-stage free cash flow to equity (FCFE) valuation.
//!
//! Stage one grows FCFE for `high_growth_years` and discounts it at the
//! CAPM cost of equity. Stage two is a Gordon terminal value at the stable
//! cost of equity. High-stage growth comes from the fundamental identity
//! `ROE x reinvestment rate` when net income and ROE are reported, otherwise
//! from the CAGR of the free cash flow history.
//!
//! The result is advisory: it is reported next to the multiples-based fair
//! value and never changes a price target or a score.

use crate::config::DcfConfig;
use analysis_core::normalize::round_score;
use analysis_core::StockInput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcfModel {
    /// Growth = ROE x (1 - FCFE / net income)
    NetIncome,
    /// Growth = CAGR of the FCFE history
    FcfeCagr,
}

/// Why no DCF value was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcfExclusion {
    FreeCashFlowMissing,
    SharesOutstandingMissing,
    BetaMissing,
    NonPositiveNetIncome,
    NonPositiveRoe,
    ReinvestmentOutOfRange,
    InsufficientHistory,
    NonPositiveHistory,
    TerminalGrowthNotBelowDiscountRate,
    NonPositiveTerminalCashFlow,
}

impl DcfExclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            DcfExclusion::FreeCashFlowMissing => "free_cash_flow_missing",
            DcfExclusion::SharesOutstandingMissing => "shares_outstanding_missing",
            DcfExclusion::BetaMissing => "beta_missing",
            DcfExclusion::NonPositiveNetIncome => "non_positive_net_income",
            DcfExclusion::NonPositiveRoe => "non_positive_roe",
            DcfExclusion::ReinvestmentOutOfRange => "reinvestment_out_of_range",
            DcfExclusion::InsufficientHistory => "insufficient_history",
            DcfExclusion::NonPositiveHistory => "non_positive_history",
            DcfExclusion::TerminalGrowthNotBelowDiscountRate => "terminal_growth_not_below_discount_rate",
            DcfExclusion::NonPositiveTerminalCashFlow => "non_positive_terminal_cash_flow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    pub value_per_share: f64,
    pub model: DcfModel,
    pub growth_high: f64,
    pub cost_of_equity_high: f64,
    pub cost_of_equity_stable: f64,
    pub stable_growth_rate: f64,
    /// FCFE for years 1..=n of the high-growth stage
    pub projected_fcfe: Vec<f64>,
    pub pv_high_growth: f64,
    pub terminal_value: f64,
    pub pv_terminal: f64,
    pub equity_value: f64,
    pub shares_outstanding: f64,
    /// Share of required and optional inputs present, weighted 0.85 / 0.15
    pub confidence: f64,
}

/// DCF block of the price-target diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfEstimate {
    pub included: bool,
    pub fair_value: Option<f64>,
    /// Relative to the current price, in percent
    pub upside_pct: Option<f64>,
    pub reason: Option<DcfExclusion>,
    pub valuation: Option<DcfValuation>,
}

impl DcfEstimate {
    pub fn from_stock(stock: &StockInput, config: &DcfConfig) -> Self {
        match two_stage_dcf(stock, config) {
            Ok(valuation) => {
                let fair_value = round_score(valuation.value_per_share, 2);
                let upside_pct = stock
                    .technical
                    .current_price
                    .filter(|p| p.is_finite() && *p > 0.0)
                    .map(|p| round_score((valuation.value_per_share / p - 1.0) * 100.0, 1));
                Self {
                    included: true,
                    fair_value: Some(fair_value),
                    upside_pct,
                    reason: None,
                    valuation: Some(valuation),
                }
            }
            Err(reason) => Self {
                included: false,
                fair_value: None,
                upside_pct: None,
                reason: Some(reason),
                valuation: None,
            },
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn positive(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v > 0.0)
}

fn reported_shares(stock: &StockInput) -> Option<f64> {
    let f = &stock.fundamentals;
    positive(f.shares_outstanding)
        .or_else(|| positive(f.current_period.as_ref().and_then(|p| p.shares_outstanding)))
}

/// Reported shares, else market cap / price.
fn shares_outstanding(stock: &StockInput) -> Option<f64> {
    reported_shares(stock).or_else(|| {
        match (positive(stock.fundamentals.market_cap), positive(stock.technical.current_price)) {
            (Some(cap), Some(price)) => Some(cap / price),
            _ => None,
        }
    })
}

fn history(stock: &StockInput) -> Vec<f64> {
    stock
        .fundamentals
        .free_cash_flow_history
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect()
}

fn confidence(stock: &StockInput, config: &DcfConfig) -> f64 {
    let f = &stock.fundamentals;
    let mut required = vec![!history(stock).is_empty() || finite(f.free_cash_flow).is_some()];
    required.push(reported_shares(stock).is_some());
    if config.cost_of_equity_high_growth.is_none() {
        required.push(finite(stock.technical.beta).is_some());
    }
    let optional = [
        finite(f.roe).is_some(),
        finite(f.current_period.as_ref().and_then(|p| p.net_income)).is_some(),
        positive(stock.technical.current_price).is_some(),
    ];

    let share = |flags: &[bool]| flags.iter().filter(|&&b| b).count() as f64 / flags.len() as f64;
    round_score(share(&required) * 0.85 + share(&optional) * 0.15, 4)
}

struct Projection {
    model: DcfModel,
    growth: f64,
    fcfe: Vec<f64>,
    terminal_fcfe: f64,
}

fn project_from_net_income(
    net_income: f64,
    roe: f64,
    fcfe0: f64,
    config: &DcfConfig,
) -> Result<Projection, DcfExclusion> {
    if net_income <= 0.0 {
        return Err(DcfExclusion::NonPositiveNetIncome);
    }
    if roe <= 0.0 {
        return Err(DcfExclusion::NonPositiveRoe);
    }
    let reinvestment = 1.0 - fcfe0 / net_income;
    if !(0.0..=1.0).contains(&reinvestment) {
        return Err(DcfExclusion::ReinvestmentOutOfRange);
    }
    let growth = roe * reinvestment;
    let n = config.high_growth_years as i32;

    let fcfe: Vec<f64> = (1..=n)
        .map(|t| net_income * (1.0 + growth).powi(t) * (1.0 - reinvestment))
        .collect();
    let last = fcfe.last().copied().unwrap_or(fcfe0);

    let g = config.stable_growth_rate;
    let terminal_fcfe = match config.stable_roe {
        Some(stable_roe) => {
            let stable_reinvestment = g / stable_roe;
            if !(0.0..=1.0).contains(&stable_reinvestment) {
                return Err(DcfExclusion::ReinvestmentOutOfRange);
            }
            net_income * (1.0 + growth).powi(n) * (1.0 + g) * (1.0 - stable_reinvestment)
        }
        None => last * (1.0 + g),
    };

    Ok(Projection {
        model: DcfModel::NetIncome,
        growth,
        fcfe,
        terminal_fcfe,
    })
}

fn project_from_history(points: &[f64], config: &DcfConfig) -> Result<Projection, DcfExclusion> {
    if points.len() < 2 {
        return Err(DcfExclusion::InsufficientHistory);
    }
    let years = config.lookback_years.min(points.len() - 1);
    let end = points[points.len() - 1];
    let start = points[points.len() - 1 - years];
    if start <= 0.0 || end <= 0.0 {
        return Err(DcfExclusion::NonPositiveHistory);
    }
    let growth = (end / start).powf(1.0 / years as f64) - 1.0;

    let fcfe: Vec<f64> = (1..=config.high_growth_years as i32)
        .map(|t| end * (1.0 + growth).powi(t))
        .collect();
    let last = fcfe.last().copied().unwrap_or(end);

    Ok(Projection {
        model: DcfModel::FcfeCagr,
        growth,
        fcfe,
        terminal_fcfe: last * (1.0 + config.stable_growth_rate),
    })
}

/// Per-share equity value from a two-stage FCFE model.
pub fn two_stage_dcf(stock: &StockInput, config: &DcfConfig) -> Result<DcfValuation, DcfExclusion> {
    let f = &stock.fundamentals;
    let points = history(stock);
    let fcfe0 = points
        .last()
        .copied()
        .or_else(|| finite(f.free_cash_flow))
        .ok_or(DcfExclusion::FreeCashFlowMissing)?;
    let shares = shares_outstanding(stock).ok_or(DcfExclusion::SharesOutstandingMissing)?;

    let cost_of_equity_high = match config.cost_of_equity_high_growth {
        Some(re) => re,
        None => {
            let beta = finite(stock.technical.beta).ok_or(DcfExclusion::BetaMissing)?;
            config.risk_free_rate + beta * config.market_risk_premium
        }
    };
    let cost_of_equity_stable = config.stable_cost_of_equity();
    let g = config.stable_growth_rate;
    if cost_of_equity_stable <= g {
        return Err(DcfExclusion::TerminalGrowthNotBelowDiscountRate);
    }

    let net_income = finite(f.current_period.as_ref().and_then(|p| p.net_income));
    let projection = match (net_income, finite(f.roe)) {
        (Some(ni), Some(roe)) => project_from_net_income(ni, roe, fcfe0, config)?,
        _ => project_from_history(&points, config)?,
    };
    if projection.terminal_fcfe <= 0.0 {
        return Err(DcfExclusion::NonPositiveTerminalCashFlow);
    }

    let discount = |t: i32| (1.0 + cost_of_equity_high).powi(t);
    let pv_high_growth: f64 = projection
        .fcfe
        .iter()
        .zip(1..)
        .map(|(cash, t)| cash / discount(t))
        .sum();
    let terminal_value = projection.terminal_fcfe / (cost_of_equity_stable - g);
    let pv_terminal = terminal_value / discount(config.high_growth_years as i32);
    let cash = finite(f.cash_and_equivalents).unwrap_or(0.0);
    let equity_value = pv_high_growth + pv_terminal + cash;

    Ok(DcfValuation {
        value_per_share: equity_value / shares,
        model: projection.model,
        growth_high: projection.growth,
        cost_of_equity_high,
        cost_of_equity_stable,
        stable_growth_rate: g,
        projected_fcfe: projection.fcfe,
        pv_high_growth,
        terminal_value,
        pv_terminal,
        equity_value,
        shares_outstanding: shares,
        confidence: confidence(stock, config),
    })
}
