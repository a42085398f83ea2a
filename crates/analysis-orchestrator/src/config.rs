use analysis_core::{AnalysisError, AnalysisResult};
use data_quality::{DataQualityConfig, GateTier, RunQualityGateThresholds};
use fundamental_analysis::{DcfConfig, OutlierConfig, PriceTargetConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Pillar weights for the total score. Normalised by their sum when applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarWeights {
    pub valuation: f64,
    pub quality: f64,
    pub technical: f64,
    pub risk: f64,
}

impl PillarWeights {
    pub const PURE_VALUE: PillarWeights = PillarWeights {
        valuation: 0.50,
        quality: 0.30,
        technical: 0.00,
        risk: 0.20,
    };

    pub const CONSERVATIVE: PillarWeights = PillarWeights {
        valuation: 0.40,
        quality: 0.30,
        technical: 0.10,
        risk: 0.20,
    };

    pub const BALANCED: PillarWeights = PillarWeights {
        valuation: 0.35,
        quality: 0.30,
        technical: 0.15,
        risk: 0.20,
    };

    /// Look up a named profile: `pure_value`, `conservative` or `balanced`.
    pub fn profile(name: &str) -> AnalysisResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pure_value" => Ok(Self::PURE_VALUE),
            "conservative" => Ok(Self::CONSERVATIVE),
            "balanced" => Ok(Self::BALANCED),
            other => Err(AnalysisError::InvalidConfig(format!("unknown weight profile '{other}'"))),
        }
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        for (name, w) in self.named() {
            if !w.is_finite() || w < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "pillar weight {name} must be non-negative, got {w}"
                )));
            }
        }
        if self.sum() <= 0.0 {
            return Err(AnalysisError::InvalidConfig("pillar weights sum to zero".to_string()));
        }
        Ok(())
    }

    /// Weights scaled to sum to one.
    pub fn normalized(&self) -> AnalysisResult<Self> {
        self.validate()?;
        let sum = self.sum();
        Ok(Self {
            valuation: self.valuation / sum,
            quality: self.quality / sum,
            technical: self.technical / sum,
            risk: self.risk / sum,
        })
    }

    fn sum(&self) -> f64 {
        self.valuation + self.quality + self.technical + self.risk
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("valuation", self.valuation),
            ("quality", self.quality),
            ("technical", self.technical),
            ("risk", self.risk),
        ]
    }
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self::BALANCED
    }
}

/// Every knob of a scoring run. Passed explicitly; the engine never reads the
/// environment while scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: PillarWeights,
    pub price_target: PriceTargetConfig,
    pub data_quality: DataQualityConfig,
    pub gate: RunQualityGateThresholds,
    pub outliers: OutlierConfig,
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> AnalysisResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AnalysisError::InvalidConfig(format!("{key}: cannot parse '{raw}'"))),
        None => Ok(default),
    }
}

fn gate_tier(lookup: &impl Fn(&str) -> Option<String>, prefix: &str, default: GateTier) -> AnalysisResult<GateTier> {
    Ok(GateTier {
        min_avg_score: parse_or(lookup, &format!("{prefix}_MIN_AVG"), default.min_avg_score)?,
        max_pct_low: parse_or(lookup, &format!("{prefix}_MAX_PCT_LOW"), default.max_pct_low)?,
        max_critical_fallback_ratio: parse_or(
            lookup,
            &format!("{prefix}_MAX_FALLBACK_RATIO"),
            default.max_critical_fallback_ratio,
        )?,
    })
}

impl ScoringConfig {
    /// Defaults overridden by `SCORING_*` environment variables.
    pub fn from_env() -> AnalysisResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`ScoringConfig::from_env`] but reads keys through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AnalysisResult<Self> {
        let defaults = Self::default();

        let base = match lookup("SCORING_WEIGHT_PROFILE") {
            Some(name) => PillarWeights::profile(&name)?,
            None => PillarWeights::default(),
        };
        let weights = PillarWeights {
            valuation: parse_or(&lookup, "SCORING_WEIGHT_VALUATION", base.valuation)?,
            quality: parse_or(&lookup, "SCORING_WEIGHT_QUALITY", base.quality)?,
            technical: parse_or(&lookup, "SCORING_WEIGHT_TECHNICAL", base.technical)?,
            risk: parse_or(&lookup, "SCORING_WEIGHT_RISK", base.risk)?,
        };

        let pt = defaults.price_target;
        let price_target = PriceTargetConfig {
            min_sector_sample_size: parse_or(&lookup, "SCORING_MIN_SECTOR_SAMPLE", pt.min_sector_sample_size)?,
            min_components: parse_or(&lookup, "SCORING_MIN_COMPONENTS", pt.min_components)?,
            fair_value_min_multiple: parse_or(&lookup, "SCORING_FAIR_VALUE_MIN_MULTIPLE", pt.fair_value_min_multiple)?,
            fair_value_max_multiple: parse_or(&lookup, "SCORING_FAIR_VALUE_MAX_MULTIPLE", pt.fair_value_max_multiple)?,
            dcf: DcfConfig {
                risk_free_rate: parse_or(&lookup, "SCORING_DCF_RISK_FREE_RATE", pt.dcf.risk_free_rate)?,
                market_risk_premium: parse_or(&lookup, "SCORING_DCF_MARKET_RISK_PREMIUM", pt.dcf.market_risk_premium)?,
                stable_growth_rate: parse_or(&lookup, "SCORING_DCF_STABLE_GROWTH", pt.dcf.stable_growth_rate)?,
                ..pt.dcf.clone()
            },
            ..pt
        };

        let dq = defaults.data_quality;
        let data_quality = DataQualityConfig {
            high_cutoff: parse_or(&lookup, "SCORING_DQ_HIGH_CUTOFF", dq.high_cutoff)?,
            medium_cutoff: parse_or(&lookup, "SCORING_DQ_MEDIUM_CUTOFF", dq.medium_cutoff)?,
        };

        let gate = RunQualityGateThresholds {
            red: gate_tier(&lookup, "SCORING_GATE_RED", defaults.gate.red)?,
            yellow: gate_tier(&lookup, "SCORING_GATE_YELLOW", defaults.gate.yellow)?,
        };

        let out = defaults.outliers;
        let outliers = OutlierConfig {
            sigma: parse_or(&lookup, "SCORING_OUTLIER_SIGMA", out.sigma)?,
            min_sector_peers: parse_or(&lookup, "SCORING_OUTLIER_MIN_PEERS", out.min_sector_peers)?,
            max_pe: parse_or(&lookup, "SCORING_OUTLIER_MAX_PE", out.max_pe)?,
        };

        let config = Self {
            weights,
            price_target,
            data_quality,
            gate,
            outliers,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.weights.validate()?;
        self.price_target.validate()?;
        self.data_quality.validate()?;
        self.gate.validate()?;
        self.outliers.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScoringConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ScoringConfig::default());
        assert_eq!(config.weights, PillarWeights::BALANCED);
        assert_eq!(config.price_target.min_sector_sample_size, 5);
    }

    #[test]
    fn test_profile_and_overrides() {
        let config = ScoringConfig::from_lookup(lookup(&[
            ("SCORING_WEIGHT_PROFILE", "pure_value"),
            ("SCORING_MIN_SECTOR_SAMPLE", "8"),
            ("SCORING_GATE_RED_MIN_AVG", "40"),
            ("SCORING_DCF_RISK_FREE_RATE", "0.03"),
        ]))
        .unwrap();
        assert_eq!(config.price_target.dcf.risk_free_rate, 0.03);
        assert_eq!(config.price_target.dcf.high_growth_years, 5);
        assert_eq!(config.weights.technical, 0.0);
        assert_eq!(config.price_target.min_sector_sample_size, 8);
        assert_eq!(config.gate.red.min_avg_score, 40.0);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(ScoringConfig::from_lookup(lookup(&[("SCORING_WEIGHT_PROFILE", "yolo")])).is_err());
        assert!(ScoringConfig::from_lookup(lookup(&[("SCORING_MIN_SECTOR_SAMPLE", "five")])).is_err());
        assert!(ScoringConfig::from_lookup(lookup(&[("SCORING_WEIGHT_RISK", "-1")])).is_err());
        // terminal growth at or above the stable discount rate
        assert!(ScoringConfig::from_lookup(lookup(&[("SCORING_DCF_STABLE_GROWTH", "0.2")])).is_err());
    }

    #[test]
    fn test_weights_normalize() {
        let w = PillarWeights {
            valuation: 2.0,
            quality: 1.0,
            technical: 1.0,
            risk: 0.0,
        }
        .normalized()
        .unwrap();
        assert_relative_eq!(w.valuation, 0.5);
        assert_relative_eq!(w.valuation + w.quality + w.technical + w.risk, 1.0);

        let zero = PillarWeights {
            valuation: 0.0,
            quality: 0.0,
            technical: 0.0,
            risk: 0.0,
        };
        assert!(zero.normalized().is_err());
    }
}
