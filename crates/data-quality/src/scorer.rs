//! Completeness and confidence assessment for one symbol's tagged inputs.

use analysis_core::normalize::{clamp, round_score};
use analysis_core::{AnalysisError, AnalysisResult, MetricRecord, MetricSource, StockInput, TRACKED_FIELDS};
use serde::{Deserialize, Serialize};

/// Upper bound on the assumption list reported per symbol.
pub const MAX_ASSUMPTIONS: usize = 10;

const CRITICAL_WEIGHT: f64 = 2.0;
const STANDARD_WEIGHT: f64 = 1.0;
const MISSING_CRITICAL_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataQualityConfig {
    pub high_cutoff: f64,
    pub medium_cutoff: f64,
}

impl Default for DataQualityConfig {
    fn default() -> Self {
        Self {
            high_cutoff: 80.0,
            medium_cutoff: 60.0,
        }
    }
}

impl DataQualityConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.high_cutoff) || !in_range(self.medium_cutoff) {
            return Err(AnalysisError::InvalidConfig(
                "data quality cutoffs must be within 0..=100".to_string(),
            ));
        }
        if self.medium_cutoff > self.high_cutoff {
            return Err(AnalysisError::InvalidConfig(format!(
                "medium_cutoff {} exceeds high_cutoff {}",
                self.medium_cutoff, self.high_cutoff
            )));
        }
        Ok(())
    }
}

/// Severity tier of a data-quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    pub fn from_score(score: f64, config: &DataQualityConfig) -> Self {
        match score {
            s if s >= config.high_cutoff => QualityTier::High,
            s if s >= config.medium_cutoff => QualityTier::Medium,
            _ => QualityTier::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityAssessment {
    /// Confidence-weighted completeness, 0..=100
    pub score: f64,
    /// 0..=1
    pub confidence: f64,
    pub completeness_ratio: f64,
    pub imputed_ratio: f64,
    pub missing_critical: Vec<String>,
    pub missing_fields: Vec<String>,
    /// Human-readable substitutions, at most [`MAX_ASSUMPTIONS`]
    pub assumptions: Vec<String>,
    pub tier: QualityTier,
}

impl DataQualityAssessment {
    pub fn has_critical_fallback(&self) -> bool {
        !self.missing_critical.is_empty()
    }
}

fn is_critical(name: &str) -> bool {
    TRACKED_FIELDS.iter().any(|f| f.name == name && f.critical)
}

fn describe_substitution(name: &str, record: &MetricRecord) -> String {
    match record.source {
        MetricSource::Derived => format!(
            "{name} derived from related line items (confidence {:.2})",
            record.confidence
        ),
        MetricSource::SectorMedian => format!("{name} filled with the sector median"),
        MetricSource::Default => format!("{name} filled with a default value"),
        MetricSource::Reported | MetricSource::Missing => {
            format!("{name} imputed upstream (confidence {:.2})", record.confidence)
        }
    }
}

/// Assess a bag of tagged metrics.
///
/// Critical fields weigh twice as much as the rest. A present field
/// contributes its confidence, a missing one contributes nothing. Each
/// missing critical field also takes 0.1 off the confidence.
pub fn assess_data_quality(records: &[(&str, MetricRecord)], config: &DataQualityConfig) -> DataQualityAssessment {
    let total = records.len();

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut present_confidence = 0.0;
    let mut present = 0usize;
    let mut imputed = 0usize;
    let mut missing_fields = Vec::new();
    let mut missing_critical = Vec::new();
    let mut substitutions = Vec::new();

    for (name, record) in records {
        let critical = is_critical(name);
        let weight = if critical { CRITICAL_WEIGHT } else { STANDARD_WEIGHT };
        total_weight += weight;

        if record.is_missing || record.value.is_none() {
            missing_fields.push(name.to_string());
            if critical {
                missing_critical.push(name.to_string());
            }
            continue;
        }

        present += 1;
        present_confidence += record.confidence;
        weighted += weight * record.confidence;
        if record.is_imputed {
            imputed += 1;
            substitutions.push(describe_substitution(name, record));
        }
    }

    let ratio = |n: usize| if total > 0 { n as f64 / total as f64 } else { 0.0 };
    let completeness_ratio = ratio(present);

    let score = if total_weight > 0.0 {
        100.0 * weighted / total_weight
    } else {
        0.0
    };
    let mean_confidence = if present > 0 {
        present_confidence / present as f64
    } else {
        0.0
    };
    let confidence = clamp(
        mean_confidence * completeness_ratio - MISSING_CRITICAL_PENALTY * missing_critical.len() as f64,
        0.0,
        1.0,
    );

    let assumptions: Vec<String> = substitutions
        .into_iter()
        .chain(
            missing_critical
                .iter()
                .map(|name| format!("{name} missing; neutral score used")),
        )
        .take(MAX_ASSUMPTIONS)
        .collect();

    let score = round_score(clamp(score, 0.0, 100.0), 1);
    DataQualityAssessment {
        score,
        confidence: round_score(confidence, 3),
        completeness_ratio: round_score(completeness_ratio, 3),
        imputed_ratio: round_score(ratio(imputed), 3),
        missing_critical,
        missing_fields,
        assumptions,
        tier: QualityTier::from_score(score, config),
    }
}

/// Assess every tracked input of a stock.
pub fn assess_stock(stock: &StockInput, config: &DataQualityConfig) -> DataQualityAssessment {
    assess_data_quality(&stock.metric_records(), config)
}
