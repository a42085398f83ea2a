use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Medians used when neither the sector nor the whole batch has a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultMedians {
    pub pe: f64,
    pub pb: f64,
    pub ps: f64,
}

impl Default for DefaultMedians {
    fn default() -> Self {
        Self {
            pe: 15.0,
            pb: 2.5,
            ps: 2.0,
        }
    }
}

/// Relative weight of each implied-price component in the fair value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub pe: f64,
    pub pb: f64,
    pub ps: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            pe: 0.5,
            pb: 0.25,
            ps: 0.25,
        }
    }
}

/// Discount below fair value for the buy target, by final confidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuyMargins {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for BuyMargins {
    fn default() -> Self {
        Self {
            high: 0.10,
            medium: 0.15,
            low: 0.25,
        }
    }
}

/// Two-stage FCFE discounted cash flow assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfConfig {
    pub high_growth_years: u32,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
    /// Perpetual growth after the high-growth stage
    pub stable_growth_rate: f64,
    pub stable_beta: f64,
    /// When set, terminal FCFE reinvests `stable_growth_rate / stable_roe` of net income
    pub stable_roe: Option<f64>,
    /// Override for `risk_free_rate + beta * market_risk_premium`
    pub cost_of_equity_high_growth: Option<f64>,
    /// Override for `risk_free_rate + stable_beta * market_risk_premium`
    pub cost_of_equity_stable: Option<f64>,
    /// Most recent history points used for the FCFE growth rate
    pub lookback_years: usize,
}

impl Default for DcfConfig {
    fn default() -> Self {
        Self {
            high_growth_years: 5,
            risk_free_rate: 0.04,
            market_risk_premium: 0.055,
            stable_growth_rate: 0.04,
            stable_beta: 1.0,
            stable_roe: None,
            cost_of_equity_high_growth: None,
            cost_of_equity_stable: None,
            lookback_years: 5,
        }
    }
}

impl DcfConfig {
    /// Discount rate of the terminal stage.
    pub fn stable_cost_of_equity(&self) -> f64 {
        self.cost_of_equity_stable
            .unwrap_or(self.risk_free_rate + self.stable_beta * self.market_risk_premium)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.high_growth_years == 0 || self.lookback_years == 0 {
            return Err(AnalysisError::InvalidConfig(
                "dcf.high_growth_years and dcf.lookback_years must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("dcf.risk_free_rate", self.risk_free_rate),
            ("dcf.stable_growth_rate", self.stable_growth_rate),
            ("dcf.stable_beta", self.stable_beta),
        ] {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidConfig(format!("{name} must be finite, got {value}")));
            }
        }
        positive("dcf.market_risk_premium", self.market_risk_premium)?;
        if let Some(roe) = self.stable_roe {
            positive("dcf.stable_roe", roe)?;
        }
        if let Some(re) = self.cost_of_equity_high_growth {
            positive("dcf.cost_of_equity_high_growth", re)?;
        }
        if self.stable_cost_of_equity() <= self.stable_growth_rate {
            return Err(AnalysisError::InvalidConfig(format!(
                "dcf stable cost of equity {} must exceed stable_growth_rate {}",
                self.stable_cost_of_equity(),
                self.stable_growth_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTargetConfig {
    /// Peers a sector needs before its own medians are trusted
    pub min_sector_sample_size: usize,
    pub default_medians: DefaultMedians,
    pub component_weights: ComponentWeights,
    /// Fewer included components than this requires deep analysis
    pub min_components: usize,
    /// Fair value is bounded to `[min, max] * current_price`
    pub fair_value_min_multiple: f64,
    pub fair_value_max_multiple: f64,
    /// Each implied price is bounded to `[min, max] * current_price`
    pub component_min_multiple: f64,
    pub component_max_multiple: f64,
    pub max_realistic_upside_pct: f64,
    pub min_realistic_upside_pct: f64,
    /// Ratios above this are ignored when computing medians
    pub max_ratio_for_median: f64,
    pub buy_margins: BuyMargins,
    pub sell_premium: f64,
    /// Advisory DCF reported in the diagnostics
    pub dcf: DcfConfig,
}

impl Default for PriceTargetConfig {
    fn default() -> Self {
        Self {
            min_sector_sample_size: 5,
            default_medians: DefaultMedians::default(),
            component_weights: ComponentWeights::default(),
            min_components: 2,
            fair_value_min_multiple: 0.33,
            fair_value_max_multiple: 3.0,
            component_min_multiple: 0.1,
            component_max_multiple: 10.0,
            max_realistic_upside_pct: 100.0,
            min_realistic_upside_pct: -60.0,
            max_ratio_for_median: 1_000.0,
            buy_margins: BuyMargins::default(),
            sell_premium: 0.05,
            dcf: DcfConfig::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> AnalysisResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!("{name} must be positive, got {value}")))
    }
}

fn fraction(name: &str, value: f64) -> AnalysisResult<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!("{name} must be in [0, 1), got {value}")))
    }
}

impl PriceTargetConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.min_sector_sample_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "min_sector_sample_size must be at least 1".to_string(),
            ));
        }
        positive("default_medians.pe", self.default_medians.pe)?;
        positive("default_medians.pb", self.default_medians.pb)?;
        positive("default_medians.ps", self.default_medians.ps)?;

        let w = &self.component_weights;
        for (name, value) in [("pe", w.pe), ("pb", w.pb), ("ps", w.ps)] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "component_weights.{name} must be non-negative, got {value}"
                )));
            }
        }
        positive("component weight sum", w.pe + w.pb + w.ps)?;

        positive("fair_value_min_multiple", self.fair_value_min_multiple)?;
        positive("component_min_multiple", self.component_min_multiple)?;
        if self.fair_value_max_multiple <= self.fair_value_min_multiple {
            return Err(AnalysisError::InvalidConfig(
                "fair_value_max_multiple must exceed fair_value_min_multiple".to_string(),
            ));
        }
        if self.component_max_multiple <= self.component_min_multiple {
            return Err(AnalysisError::InvalidConfig(
                "component_max_multiple must exceed component_min_multiple".to_string(),
            ));
        }
        if self.max_realistic_upside_pct <= self.min_realistic_upside_pct {
            return Err(AnalysisError::InvalidConfig(
                "max_realistic_upside_pct must exceed min_realistic_upside_pct".to_string(),
            ));
        }
        positive("max_ratio_for_median", self.max_ratio_for_median)?;

        fraction("buy_margins.high", self.buy_margins.high)?;
        fraction("buy_margins.medium", self.buy_margins.medium)?;
        fraction("buy_margins.low", self.buy_margins.low)?;
        if !self.sell_premium.is_finite() || self.sell_premium < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "sell_premium must be non-negative, got {}",
                self.sell_premium
            )));
        }
        self.dcf.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Distance from the sector mean, in standard deviations, that gets flagged
    pub sigma: f64,
    /// Sectors with fewer values for a metric produce no flags for it
    pub min_sector_peers: usize,
    pub max_pe: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            sigma: 3.0,
            min_sector_peers: 3,
            max_pe: 1_000.0,
        }
    }
}

impl OutlierConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        positive("outliers.sigma", self.sigma)?;
        positive("outliers.max_pe", self.max_pe)?;
        if self.min_sector_peers < 2 {
            return Err(AnalysisError::InvalidConfig(
                "outliers.min_sector_peers must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PriceTargetConfig::default().validate().is_ok());
        assert!(OutlierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = PriceTargetConfig {
            fair_value_min_multiple: 3.0,
            fair_value_max_multiple: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_weights() {
        let config = PriceTargetConfig {
            component_weights: ComponentWeights {
                pe: 0.0,
                pb: 0.0,
                ps: 0.0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_terminal_growth_above_discount_rate() {
        let config = PriceTargetConfig {
            dcf: DcfConfig {
                stable_growth_rate: 0.12,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));
        assert!((DcfConfig::default().stable_cost_of_equity() - 0.095).abs() < 1e-12);
    }
}
