//! Per-symbol data-quality assessment, batch summary and the run quality gate.

pub mod gate;
pub mod scorer;
pub mod summary;

pub use gate::{evaluate_run_quality_gate, GateMetrics, GateStatus, GateTier, RunQualityGate, RunQualityGateThresholds};
pub use scorer::{assess_data_quality, assess_stock, DataQualityAssessment, DataQualityConfig, QualityTier, MAX_ASSUMPTIONS};
pub use summary::{summarize_data_quality, DataQualitySummary};
