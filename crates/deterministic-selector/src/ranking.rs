use analysis_core::Scored;
use std::cmp::Ordering;

/// Total order: higher score first, ties broken by ascending symbol.
/// NaN scores, whatever their sign bit, sort after every number.
pub fn compare_scores<T: Scored>(a: &T, b: &T) -> Ordering {
    let (sa, sb) = (a.total_score(), b.total_score());
    let by_score = match (sa.is_nan(), sb.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => sb.total_cmp(&sa),
    };
    by_score.then_with(|| a.symbol().cmp(b.symbol()))
}

/// Sorted copy of `scores`. Input order never affects the result.
pub fn sort_scores_deterministic<T: Scored + Clone>(scores: &[T]) -> Vec<T> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(compare_scores);
    sorted
}

/// The first `k` entries of the deterministic order.
pub fn select_top_k<T: Scored + Clone>(scores: &[T], k: usize) -> Vec<T> {
    let mut sorted = sort_scores_deterministic(scores);
    sorted.truncate(k);
    sorted
}
