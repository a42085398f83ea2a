//! Run-level quality gate.
//!
//! A red gate blocks publishing: downstream consumers must withhold the run's
//! selections when `blocked` is set.

use crate::summary::DataQualitySummary;
use analysis_core::normalize::round_score;
use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One severity tier: breaching any of the three cutoffs triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateTier {
    /// Average data-quality score must not fall below this
    pub min_avg_score: f64,
    /// Percentage of low-tier symbols must not exceed this (0..=100)
    pub max_pct_low: f64,
    /// Share of symbols with a critical fallback must not exceed this (0..=1)
    pub max_critical_fallback_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunQualityGateThresholds {
    pub red: GateTier,
    pub yellow: GateTier,
}

impl Default for RunQualityGateThresholds {
    fn default() -> Self {
        Self {
            red: GateTier {
                min_avg_score: 50.0,
                max_pct_low: 50.0,
                max_critical_fallback_ratio: 0.50,
            },
            yellow: GateTier {
                min_avg_score: 70.0,
                max_pct_low: 25.0,
                max_critical_fallback_ratio: 0.20,
            },
        }
    }
}

impl RunQualityGateThresholds {
    pub fn validate(&self) -> AnalysisResult<()> {
        for (name, tier) in [("red", &self.red), ("yellow", &self.yellow)] {
            if !(0.0..=100.0).contains(&tier.min_avg_score) || !(0.0..=100.0).contains(&tier.max_pct_low) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} gate score and pct_low cutoffs must be within 0..=100"
                )));
            }
            if !(0.0..=1.0).contains(&tier.max_critical_fallback_ratio) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} gate critical fallback ratio must be within 0..=1"
                )));
            }
        }
        if self.yellow.min_avg_score < self.red.min_avg_score
            || self.yellow.max_pct_low > self.red.max_pct_low
            || self.yellow.max_critical_fallback_ratio > self.red.max_critical_fallback_ratio
        {
            return Err(AnalysisError::InvalidConfig(
                "yellow gate cutoffs must be at least as strict as red".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Green,
    Yellow,
    Red,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Green => "green",
            GateStatus::Yellow => "yellow",
            GateStatus::Red => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateMetrics {
    pub symbol_count: usize,
    pub avg_data_quality_score: f64,
    pub pct_low: f64,
    pub critical_fallback_count: usize,
    pub critical_fallback_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunQualityGate {
    pub status: GateStatus,
    pub blocked: bool,
    pub reasons: Vec<String>,
    pub metrics: GateMetrics,
    pub thresholds: RunQualityGateThresholds,
}

fn breaches(tier_name: &str, tier: &GateTier, metrics: &GateMetrics) -> Vec<String> {
    let mut reasons = Vec::new();
    if metrics.avg_data_quality_score < tier.min_avg_score {
        reasons.push(format!(
            "{tier_name}: avg_data_quality_score {:.1} below floor of {:.1}",
            metrics.avg_data_quality_score, tier.min_avg_score
        ));
    }
    if metrics.pct_low > tier.max_pct_low {
        reasons.push(format!(
            "{tier_name}: pct_low {:.1}% exceeds limit of {:.1}%",
            metrics.pct_low, tier.max_pct_low
        ));
    }
    if metrics.critical_fallback_ratio > tier.max_critical_fallback_ratio {
        reasons.push(format!(
            "{tier_name}: critical_fallback_ratio {:.3} exceeds limit of {:.3}",
            metrics.critical_fallback_ratio, tier.max_critical_fallback_ratio
        ));
    }
    reasons
}

/// Classify a run as green, yellow or red.
///
/// Red if any metric breaches a red cutoff, else yellow if any breaches a
/// yellow cutoff, else green. An empty run is red.
pub fn evaluate_run_quality_gate(
    summary: &DataQualitySummary,
    symbol_count: usize,
    thresholds: &RunQualityGateThresholds,
) -> RunQualityGate {
    let ratio = if symbol_count > 0 {
        summary.critical_fallback_count as f64 / symbol_count as f64
    } else {
        0.0
    };
    let metrics = GateMetrics {
        symbol_count,
        avg_data_quality_score: round_score(summary.avg_data_quality_score, 1),
        pct_low: round_score(summary.pct_low, 1),
        critical_fallback_count: summary.critical_fallback_count,
        critical_fallback_ratio: round_score(ratio, 3),
    };

    let (status, reasons) = if symbol_count == 0 {
        (GateStatus::Red, vec!["red: no symbols evaluated".to_string()])
    } else {
        let red = breaches("red", &thresholds.red, &metrics);
        if !red.is_empty() {
            (GateStatus::Red, red)
        } else {
            let yellow = breaches("yellow", &thresholds.yellow, &metrics);
            if yellow.is_empty() {
                (GateStatus::Green, yellow)
            } else {
                (GateStatus::Yellow, yellow)
            }
        }
    };

    if status != GateStatus::Green {
        warn!(status = status.as_str(), reasons = %reasons.join("; "), "Run quality gate not green");
    }

    RunQualityGate {
        status,
        blocked: status == GateStatus::Red,
        reasons,
        metrics,
        thresholds: *thresholds,
    }
}
