//! Seeded daily pick.

use crate::ranking::sort_scores_deterministic;
use analysis_core::{AnalysisError, AnalysisResult, Scored};
use sha2::{Digest, Sha256};

/// Salt for the pick-of-the-day seed.
pub const PICK_OF_THE_DAY_SALT: &str = "pick_of_the_day";

/// Stable non-negative integer derived from `date` and `salt`.
///
/// First eight bytes of `sha256("{date}:{salt}")`, big-endian, with the top
/// bit cleared so the value also fits an `i64`.
pub fn deterministic_seed(date: &str, salt: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(date.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) & (i64::MAX as u64)
}

/// `items[seed % items.len()]`.
///
/// An empty list is a caller bug and returns [`AnalysisError::EmptyCandidates`].
pub fn pick_deterministic<T>(items: &[T], seed: u64) -> AnalysisResult<&T> {
    if items.is_empty() {
        return Err(AnalysisError::EmptyCandidates);
    }
    let index = (seed % items.len() as u64) as usize;
    Ok(&items[index])
}

/// Pick of the day among `candidates`, after putting them in deterministic order.
pub fn pick_of_the_day<T: Scored + Clone>(candidates: &[T], date: &str) -> AnalysisResult<T> {
    let ordered = sort_scores_deterministic(candidates);
    let seed = deterministic_seed(date, PICK_OF_THE_DAY_SALT);
    pick_deterministic(&ordered, seed).cloned()
}

/// Recompute the pick for `date` over `candidates` and compare it with
/// `claimed_symbol`. Candidates are ordered the same way [`pick_of_the_day`]
/// orders them, so any permutation of the published list verifies.
pub fn verify_pick_of_day<T: Scored + Clone>(candidates: &[T], date: &str, claimed_symbol: &str) -> bool {
    match pick_of_the_day(candidates, date) {
        Ok(pick) => pick.symbol() == claimed_symbol,
        Err(_) => false,
    }
}
