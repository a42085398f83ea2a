//! Scoring orchestration: configuration, per-symbol scoring and the
//! two-phase batch run that produces the run record.

pub mod config;
pub mod limit;
pub mod run;
pub mod scorer;


pub use config::{PillarWeights, ScoringConfig};
pub use limit::{apply_symbol_limit, SymbolLimitReport};
pub use run::{build_batch_context, run_scoring, BenchmarkInput, RunRecord, ScoreOptions};
pub use scorer::{score_symbol, total_score, BatchContext, ScoreBreakdown, SymbolScore};
