pub mod indicators;
pub mod momentum;
pub mod pillars;

#[cfg(test)]
mod indicators_tests;

pub use momentum::{
    momentum_soft_cap_score, sma_min_score, sma_strength_default, sma_strength_score, DEFAULT_TREND_EPSILON,
    DEFAULT_TREND_TAU,
};
pub use pillars::{risk_pillar, technical_pillar, volatility_score};
