//! Selection lists for a run and their plain-text rendering.

use crate::pick::{deterministic_seed, pick_deterministic, PICK_OF_THE_DAY_SALT};
use crate::ranking::sort_scores_deterministic;
use analysis_core::normalize::round1;
use analysis_core::Scored;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// Number of top entries the pick of the day is drawn from.
pub const PICK_POOL_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPick {
    /// 1-based position in the deterministic order
    pub rank: usize,
    pub symbol: String,
    pub total_score: f64,
}

impl Scored for RankedPick {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn total_score(&self) -> f64 {
        self.total_score
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selections {
    pub top5: Vec<RankedPick>,
    pub top10: Vec<RankedPick>,
    pub top20: Vec<RankedPick>,
    /// `None` only for an empty run
    pub pick_of_the_day: Option<RankedPick>,
    pub pick_seed: u64,
}

/// Rank `scores` and draw the pick of the day for `date` from the top five.
pub fn build_selections<T: Scored + Clone>(scores: &[T], date: &str) -> Selections {
    let ranked: Vec<RankedPick> = sort_scores_deterministic(scores)
        .iter()
        .enumerate()
        .map(|(i, s)| RankedPick {
            rank: i + 1,
            symbol: s.symbol().to_string(),
            total_score: s.total_score(),
        })
        .collect();

    let top = |k: usize| ranked.iter().take(k).cloned().collect::<Vec<_>>();
    let top5 = top(PICK_POOL_SIZE);
    let pick_seed = deterministic_seed(date, PICK_OF_THE_DAY_SALT);
    let pick_of_the_day = pick_deterministic(&top5, pick_seed).ok().cloned();

    if let Some(pick) = &pick_of_the_day {
        debug!(date, symbol = %pick.symbol, seed = pick_seed, "Pick of the day");
    }

    Selections {
        top10: top(10),
        top20: top(20),
        top5,
        pick_of_the_day,
        pick_seed,
    }
}

fn write_rows(out: &mut String, rows: &[RankedPick]) {
    for row in rows {
        let _ = writeln!(out, "  {:>2}. {:<8} {:>5.1}", row.rank, row.symbol, round1(row.total_score));
    }
}

/// Plain-text summary: pick of the day, the top 5, then ranks 6-10.
pub fn format_ranking_summary(selections: &Selections) -> String {
    let mut out = String::new();
    match &selections.pick_of_the_day {
        Some(pick) => {
            let _ = writeln!(out, "Pick of the day: {} ({:.1})", pick.symbol, round1(pick.total_score));
        }
        None => out.push_str("Pick of the day: none\n"),
    }

    out.push_str("Top 5:\n");
    write_rows(&mut out, &selections.top5);

    if selections.top10.len() > selections.top5.len() {
        out.push_str("Top 10 (continued):\n");
        write_rows(&mut out, &selections.top10[selections.top5.len()..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pick::verify_pick_of_day;

    fn picks(n: usize) -> Vec<RankedPick> {
        (0..n)
            .map(|i| RankedPick {
                rank: 0,
                symbol: format!("S{i:02}"),
                total_score: 50.0 + i as f64,
            })
            .collect()
    }

    #[test]
    fn test_selection_sizes_and_ranks() {
        let selections = build_selections(&picks(12), "2024-06-03");
        assert_eq!(selections.top5.len(), 5);
        assert_eq!(selections.top10.len(), 10);
        assert_eq!(selections.top20.len(), 12);
        assert_eq!(selections.top5[0].symbol, "S11");
        assert_eq!(selections.top5[0].rank, 1);
        assert_eq!(selections.top20[11].rank, 12);
    }

    #[test]
    fn test_pick_comes_from_top5_and_verifies() {
        let date = "2024-06-03";
        let selections = build_selections(&picks(12), date);
        let pick = selections.pick_of_the_day.clone().unwrap();
        assert!(selections.top5.contains(&pick));
        assert!(verify_pick_of_day(&selections.top5, date, &pick.symbol));
        assert_eq!(selections.pick_seed, deterministic_seed(date, PICK_OF_THE_DAY_SALT));
    }

    #[test]
    fn test_empty_run_has_no_pick() {
        let selections = build_selections::<RankedPick>(&[], "2024-06-03");
        assert!(selections.pick_of_the_day.is_none());
        assert!(format_ranking_summary(&selections).contains("Pick of the day: none"));
    }

    #[test]
    fn test_summary_text() {
        let selections = build_selections(&picks(7), "2024-06-03");
        let text = format_ranking_summary(&selections);
        assert!(text.starts_with("Pick of the day: "));
        assert!(text.contains("Top 5:\n   1. S06"));
        assert!(text.contains("Top 10 (continued):\n   6. S01"));
    }
}
