//! score-runner: score a frozen batch file and emit the run record as JSON.
//!
//! Usage:
//!   cargo run -p score-runner -- batch.json
//!   cargo run -p score-runner -- batch.json --date 2024-06-03 --limit 500
//!   cargo run -p score-runner -- batch.json --scan-only --pretty --out run.json
//!
//! Exits with status 2, without writing the record, when the run quality
//! gate blocks publishing.

use analysis_orchestrator::{run_scoring, RunRecord, ScoreOptions, ScoringConfig};
use anyhow::{Context, Result};
use deterministic_selector::format_ranking_summary;
use std::path::PathBuf;

mod batch;

use batch::load_batch;

const BLOCKED_EXIT_CODE: i32 = 2;

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "score_runner=info,analysis_orchestrator=info".into())
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  score-runner <batch.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --date YYYY-MM-DD  Run date (default: batch as_of, then today UTC)");
    eprintln!("  --limit N          Score only the first N symbols");
    eprintln!("  --scan-only        Skip price targets");
    eprintln!("  --out PATH         Write the record to PATH instead of stdout");
    eprintln!("  --pretty           Pretty-print JSON");
    std::process::exit(1);
}

/// What the runner reports for a finished record.
#[derive(Debug, PartialEq)]
enum Report {
    /// Gate reasons only; selections are withheld
    Blocked(Vec<String>),
    Publish { summary: Vec<String>, warnings: Vec<String> },
}

fn report(record: &RunRecord) -> Report {
    let reasons = record.quality_gate.reasons.clone();
    if record.is_blocked() {
        return Report::Blocked(reasons);
    }

    let mut summary: Vec<String> = format_ranking_summary(&record.selections)
        .lines()
        .map(str::to_string)
        .collect();
    if let Some(mode) = &record.mode {
        summary.push(format!(
            "Market mode: {} (score {}, confidence {})",
            mode.label.name(),
            mode.score,
            mode.confidence
        ));
    }
    Report::Publish {
        summary,
        warnings: reasons,
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let flag_value = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let Some(batch_path) = args.first().filter(|a| !a.starts_with("--")).map(PathBuf::from) else {
        usage();
    };
    let scan_only = args.iter().any(|a| a == "--scan-only");
    let pretty = args.iter().any(|a| a == "--pretty");
    let out_path = flag_value("--out").map(PathBuf::from);
    let symbol_limit = flag_value("--limit")
        .map(|v| v.parse::<usize>().with_context(|| format!("--limit expects a count, got '{v}'")))
        .transpose()?;

    let config = ScoringConfig::from_env().context("invalid SCORING_* configuration")?;
    let batch = load_batch(&batch_path)?;

    let as_of = match flag_value("--date").or(batch.as_of) {
        Some(date) => date,
        None => {
            let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
            tracing::warn!("No run date given, using today ({today}); the pick will differ on other days");
            today
        }
    };

    tracing::info!(
        "Loaded {} symbols from {} (weights: {:?})",
        batch.stocks.len(),
        batch_path.display(),
        config.weights
    );

    let options = ScoreOptions {
        as_of,
        scan_only,
        symbol_limit,
        benchmark: batch.benchmark,
    };
    let record = run_scoring(&batch.stocks, &options, &config)?;

    match report(&record) {
        Report::Blocked(reasons) => {
            for reason in &reasons {
                tracing::error!("Quality gate: {reason}");
            }
            tracing::error!("Run blocked by the quality gate, selections withheld");
            std::process::exit(BLOCKED_EXIT_CODE);
        }
        Report::Publish { summary, warnings } => {
            for line in &summary {
                tracing::info!("{line}");
            }
            for reason in &warnings {
                tracing::warn!("Quality gate: {reason}");
            }
        }
    }

    let json = if pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };
    match out_path {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Run record written to {} (hash {})", path.display(), record.content_hash);
        }
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::StockInput;

    fn bare_run() -> RunRecord {
        let stocks: Vec<StockInput> = ["AAA", "BBB", "CCC"].iter().map(|s| StockInput::new(*s)).collect();
        let options = ScoreOptions {
            as_of: "2024-06-03".to_string(),
            ..Default::default()
        };
        run_scoring(&stocks, &options, &ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_blocked_run_reports_no_selections() {
        let record = bare_run();
        assert!(record.is_blocked());
        match report(&record) {
            Report::Blocked(reasons) => assert_eq!(reasons, record.quality_gate.reasons),
            other => panic!("expected a blocked report, got {other:?}"),
        }
    }

    #[test]
    fn test_unblocked_run_reports_summary_then_warnings() {
        let mut record = bare_run();
        record.quality_gate.blocked = false;
        match report(&record) {
            Report::Publish { summary, warnings } => {
                assert!(summary[0].starts_with("Pick of the day: "));
                assert_eq!(warnings, record.quality_gate.reasons);
            }
            other => panic!("expected a publishable report, got {other:?}"),
        }
    }
}
