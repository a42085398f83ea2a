use serde::{Deserialize, Serialize};

/// What the symbol limit did to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLimitReport {
    pub requested: Option<usize>,
    /// Number of symbols actually scored
    pub applied: usize,
    pub truncated: bool,
}

/// Keep the first `max_n` items, without re-sorting.
///
/// Reproducibility across runs relies on the caller passing a stable order
/// (e.g. alphabetical).
pub fn apply_symbol_limit<T>(items: &[T], max_n: Option<usize>) -> (&[T], SymbolLimitReport) {
    let applied = max_n.map_or(items.len(), |n| n.min(items.len()));
    let report = SymbolLimitReport {
        requested: max_n,
        applied,
        truncated: applied < items.len(),
    };
    (&items[..applied], report)
}
