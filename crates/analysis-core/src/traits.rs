/// Anything that can be ranked by the deterministic selector.
pub trait Scored {
    fn symbol(&self) -> &str;
    fn total_score(&self) -> f64;
}
