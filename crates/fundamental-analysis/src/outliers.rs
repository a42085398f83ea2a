//! Advisory outlier flags. Flags annotate a symbol; they never filter or reweight it.

use crate::config::OutlierConfig;
use analysis_core::stats::{population_std_dev, z_score_of};
use analysis_core::{Fundamentals, StockInput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Metrics compared within each sector, by wire name.
const SECTOR_METRICS: &[&str] = &[
    "peRatio",
    "pbRatio",
    "psRatio",
    "evEbitda",
    "roe",
    "roa",
    "grossMargin",
    "operatingMargin",
    "debtToEquity",
    "revenueGrowth",
];

fn sector_metric(f: &Fundamentals, metric: &str) -> Option<f64> {
    let value = match metric {
        "peRatio" => f.pe_ratio,
        "pbRatio" => f.pb_ratio,
        "psRatio" => f.ps_ratio,
        "evEbitda" => f.ev_ebitda,
        "roe" => f.roe,
        "roa" => f.roa,
        "grossMargin" => f.gross_margin,
        "operatingMargin" => f.operating_margin,
        "debtToEquity" => f.debt_to_equity,
        "revenueGrowth" => f.revenue_growth,
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

const SIGMA_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierSummary {
    pub symbols_evaluated: usize,
    pub symbols_with_outliers: usize,
    /// Count of each `rule:*` flag across the batch
    pub rule_flags: BTreeMap<String, usize>,
    pub sector_flags: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierReport {
    /// Every evaluated symbol, with an empty list when nothing was flagged
    pub flags_by_symbol: BTreeMap<String, Vec<String>>,
    pub summary: OutlierSummary,
}

impl OutlierReport {
    pub fn flags_for(&self, symbol: &str) -> &[String] {
        self.flags_by_symbol.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn rule_flags(stock: &StockInput, config: &OutlierConfig) -> Vec<&'static str> {
    let f = &stock.fundamentals;
    let mut flags = Vec::new();

    if f.revenue.is_some_and(|v| v < 0.0) {
        flags.push("rule:negative_revenue");
    }
    if f.pe_ratio.is_some_and(|v| v > config.max_pe) {
        flags.push("rule:extreme_pe");
    }
    if f.debt_to_equity.is_some_and(|v| v < 0.0) {
        flags.push("rule:negative_debt_to_equity");
    }
    if f.gross_margin.is_some_and(|v| v > 1.0) {
        flags.push("rule:gross_margin_above_100pct");
    }
    if stock.technical.current_price.is_some_and(|v| v <= 0.0) {
        flags.push("rule:non_positive_price");
    }
    if f.market_cap.is_some_and(|v| v < 0.0) {
        flags.push("rule:negative_market_cap");
    }
    flags
}

/// Flag values more than `config.sigma` population standard deviations from
/// their sector mean, then apply the fixed domain rules.
pub fn detect_fundamental_outliers(stocks: &[StockInput], config: &OutlierConfig) -> OutlierReport {
    let mut flags: Vec<Vec<String>> = vec![Vec::new(); stocks.len()];

    let mut sectors: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, stock) in stocks.iter().enumerate() {
        if let Some(sector) = stock.sector_key() {
            sectors.entry(sector).or_default().push(i);
        }
    }

    let mut sector_flags = 0;
    for (sector, members) in &sectors {
        for &metric in SECTOR_METRICS {
            let observed: Vec<(usize, f64)> = members
                .iter()
                .filter_map(|&i| sector_metric(&stocks[i].fundamentals, metric).map(|v| (i, v)))
                .collect();
            if observed.len() < config.min_sector_peers {
                continue;
            }

            let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
            if population_std_dev(&values) < SIGMA_EPSILON {
                continue;
            }

            for (i, v) in observed {
                let z = z_score_of(v, &values);
                if z.abs() > config.sigma {
                    debug!(symbol = %stocks[i].symbol, sector, metric, z, "Sector outlier");
                    flags[i].push(format!("sector_3sigma:{metric}"));
                    sector_flags += 1;
                }
            }
        }
    }

    let mut summary = OutlierSummary {
        symbols_evaluated: stocks.len(),
        sector_flags,
        ..Default::default()
    };
    for (i, stock) in stocks.iter().enumerate() {
        for rule in rule_flags(stock, config) {
            *summary.rule_flags.entry(rule.to_string()).or_default() += 1;
            flags[i].push(rule.to_string());
        }
    }

    let mut flags_by_symbol: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (stock, symbol_flags) in stocks.iter().zip(flags) {
        flags_by_symbol.entry(stock.symbol.clone()).or_default().extend(symbol_flags);
    }
    summary.symbols_with_outliers = flags_by_symbol.values().filter(|f| !f.is_empty()).count();

    OutlierReport {
        flags_by_symbol,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(symbol: &str, pe: f64) -> StockInput {
        let mut s = StockInput::new(symbol);
        s.sector = Some("Financials".to_string());
        s.fundamentals.pe_ratio = Some(pe);
        s
    }

    #[test]
    fn test_flags_only_the_extreme_pe() {
        let mut stocks: Vec<StockInput> = (0..10).map(|i| peer(&format!("P{i:02}"), 10.0)).collect();
        stocks.push(peer("WILD", 100.0));

        let report = detect_fundamental_outliers(&stocks, &OutlierConfig::default());

        assert_eq!(report.flags_for("WILD"), ["sector_3sigma:peRatio".to_string()]);
        for i in 0..10 {
            assert!(report.flags_for(&format!("P{i:02}")).is_empty());
        }
        assert_eq!(report.flags_by_symbol.len(), 11);
        assert_eq!(report.summary.symbols_evaluated, 11);
        assert_eq!(report.summary.symbols_with_outliers, 1);
        assert!(report.summary.rule_flags.is_empty());
    }

    #[test]
    fn test_small_sector_produces_no_sector_flags() {
        let stocks = vec![peer("A", 10.0), peer("B", 500.0)];
        let report = detect_fundamental_outliers(&stocks, &OutlierConfig::default());
        assert_eq!(report.summary.symbols_with_outliers, 0);
    }

    #[test]
    fn test_rule_pass_is_independent_of_peers() {
        let mut odd = StockInput::new("ODD");
        odd.fundamentals.revenue = Some(-5.0);
        odd.fundamentals.pe_ratio = Some(1_500.0);
        odd.fundamentals.debt_to_equity = Some(-0.4);

        let report = detect_fundamental_outliers(&[odd], &OutlierConfig::default());
        assert_eq!(
            report.flags_for("ODD"),
            [
                "rule:negative_revenue".to_string(),
                "rule:extreme_pe".to_string(),
                "rule:negative_debt_to_equity".to_string(),
            ]
        );
        assert_eq!(report.summary.rule_flags["rule:extreme_pe"], 1);
    }

    #[test]
    fn test_wire_keys_are_camel_case() {
        let report = detect_fundamental_outliers(&[peer("A", 10.0)], &OutlierConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("flagsBySymbol").is_some());
        assert!(json["summary"].get("symbolsWithOutliers").is_some());
        assert!(json["summary"].get("ruleFlags").is_some());
    }
}
