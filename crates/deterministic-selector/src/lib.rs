//! Reproducible ranking and daily selection.
//!
//! Same scores and date in, same ranking, pick and hash out.

pub mod hash;
pub mod pick;
pub mod ranking;
pub mod summary;

pub use hash::{canonicalize, content_hash};
pub use pick::{deterministic_seed, pick_deterministic, pick_of_the_day, verify_pick_of_day, PICK_OF_THE_DAY_SALT};
pub use ranking::{compare_scores, select_top_k, sort_scores_deterministic};
pub use summary::{build_selections, format_ranking_summary, RankedPick, Selections};
