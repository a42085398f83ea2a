//! Batch file loading.

use analysis_core::StockInput;
use analysis_orchestrator::BenchmarkInput;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// A frozen scoring batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Batch {
    /// Run date carried by the file, if any
    #[serde(default)]
    pub as_of: Option<String>,
    pub stocks: Vec<StockInput>,
    #[serde(default)]
    pub benchmark: Option<BenchmarkInput>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Full(Batch),
    Stocks(Vec<StockInput>),
}

impl From<BatchFile> for Batch {
    fn from(file: BatchFile) -> Self {
        match file {
            BatchFile::Full(batch) => batch,
            BatchFile::Stocks(stocks) => Batch {
                stocks,
                ..Default::default()
            },
        }
    }
}

/// Parse either a bare list of stocks or `{ "as_of", "stocks", "benchmark" }`.
pub fn parse_batch(raw: &str) -> Result<Batch> {
    let file: BatchFile = serde_json::from_str(raw).context("batch is neither a stock list nor a batch object")?;
    Ok(file.into())
}

pub fn load_batch(path: &Path) -> Result<Batch> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_batch(&raw).with_context(|| format!("parsing {}", path.display()))
}
