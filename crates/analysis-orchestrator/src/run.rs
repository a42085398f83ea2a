//! Two-phase batch run producing the run record.
//!
//! Phase 1 builds sector medians and outlier statistics over the complete
//! (already limited) batch. Phase 2 scores symbols in parallel against those
//! read-only aggregates. Parallelism never changes the output: results keep
//! input order and nothing is shared mutably.

use crate::config::ScoringConfig;
use crate::limit::{apply_symbol_limit, SymbolLimitReport};
use crate::scorer::{score_symbol, BatchContext, SymbolScore};
use analysis_core::stats::percentile_rank;
use analysis_core::{AnalysisError, AnalysisResult, StockInput};
use chrono::NaiveDate;
use data_quality::{evaluate_run_quality_gate, summarize_data_quality, DataQualitySummary, RunQualityGate};
use deterministic_selector::{build_selections, content_hash, Selections};
use fundamental_analysis::{calculate_sector_medians, detect_fundamental_outliers, OutlierReport};
use market_regime_detector::{MarketModeDetector, ModeResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Benchmark series for the market mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkInput {
    /// Daily closes, oldest first
    pub closes: Vec<f64>,
    #[serde(default)]
    pub breadth: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreOptions {
    /// Run date, `YYYY-MM-DD`. Seeds the pick of the day.
    pub as_of: String,
    #[serde(default)]
    pub scan_only: bool,
    #[serde(default)]
    pub symbol_limit: Option<usize>,
    #[serde(default)]
    pub benchmark: Option<BenchmarkInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub as_of: String,
    pub scan_only: bool,
    pub symbol_limit: SymbolLimitReport,
    pub scores: Vec<SymbolScore>,
    pub selections: Selections,
    pub data_quality_summary: DataQualitySummary,
    pub quality_gate: RunQualityGate,
    pub outliers: OutlierReport,
    pub mode: Option<ModeResult>,
    /// Content hash of this record with this field left empty
    pub content_hash: String,
}

impl RunRecord {
    /// Hash of the record with `content_hash` blanked.
    pub fn compute_hash(&self) -> AnalysisResult<String> {
        let mut unhashed = self.clone();
        unhashed.content_hash = String::new();
        content_hash(&unhashed)
    }

    /// Recompute the hash and compare with the stored one.
    pub fn verify_hash(&self) -> AnalysisResult<bool> {
        Ok(self.compute_hash()? == self.content_hash)
    }

    /// Selections must be withheld from publishing when this is set.
    pub fn is_blocked(&self) -> bool {
        self.quality_gate.blocked
    }
}

fn parse_as_of(as_of: &str) -> AnalysisResult<String> {
    NaiveDate::parse_from_str(as_of.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| AnalysisError::InvalidInput(format!("as_of '{as_of}' is not a YYYY-MM-DD date: {e}")))
}

/// Phase 1: batch-wide aggregates over every symbol that will be scored.
pub fn build_batch_context(stocks: &[StockInput], config: &ScoringConfig) -> BatchContext {
    BatchContext {
        medians: calculate_sector_medians(stocks, &config.price_target),
        outliers: detect_fundamental_outliers(stocks, &config.outliers),
    }
}

/// Score a frozen batch and assemble the run record.
///
/// The result depends only on `stocks`, `options` and `config`.
pub fn run_scoring(stocks: &[StockInput], options: &ScoreOptions, config: &ScoringConfig) -> AnalysisResult<RunRecord> {
    config.validate()?;
    let weights = config.weights.normalized()?;
    let as_of = parse_as_of(&options.as_of)?;

    let (batch, symbol_limit) = apply_symbol_limit(stocks, options.symbol_limit);
    info!(
        as_of = %as_of,
        symbols = batch.len(),
        truncated = symbol_limit.truncated,
        scan_only = options.scan_only,
        "Scoring run started"
    );

    let context = build_batch_context(batch, config);
    info!(
        sectors = context.medians.sectors.len(),
        symbols_with_outliers = context.outliers.summary.symbols_with_outliers,
        "Batch aggregates ready"
    );

    let mut scores: Vec<SymbolScore> = batch
        .par_iter()
        .map(|stock| score_symbol(stock, &context, config, &weights, options.scan_only))
        .collect();

    let universe: Vec<Option<f64>> = scores.iter().map(|s| Some(s.evidence.valuation)).collect();
    for score in &mut scores {
        score.breakdown.valuation_percentile = percentile_rank(Some(score.evidence.valuation), &universe);
    }

    let assessments: Vec<_> = scores.iter().map(|s| s.data_quality.clone()).collect();
    let coverage: Vec<f64> = batch.iter().map(StockInput::valuation_coverage).collect();
    let data_quality_summary = summarize_data_quality(&assessments, &coverage, &config.data_quality);
    let quality_gate = evaluate_run_quality_gate(&data_quality_summary, scores.len(), &config.gate);

    let selections = build_selections(&scores, &as_of);
    let mode = options
        .benchmark
        .as_ref()
        .map(|b| MarketModeDetector::default().detect_mode(&b.closes, b.breadth));

    let mut record = RunRecord {
        as_of,
        scan_only: options.scan_only,
        symbol_limit,
        scores,
        selections,
        data_quality_summary,
        quality_gate,
        outliers: context.outliers,
        mode,
        content_hash: String::new(),
    };
    record.content_hash = record.compute_hash()?;

    info!(
        gate = record.quality_gate.status.as_str(),
        pick = record.selections.pick_of_the_day.as_ref().map(|p| p.symbol.as_str()).unwrap_or("-"),
        hash = %record.content_hash,
        "Scoring run finished"
    );
    Ok(record)
}
