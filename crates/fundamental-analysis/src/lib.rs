//! Fundamental scoring: Piotroski F-score, valuation and quality pillars,
//! batch sector medians, outlier flags, the sector-relative price target and
//! an advisory two-stage DCF.

pub mod config;
pub mod dcf;
pub mod outliers;
pub mod piotroski;
pub mod pillars;
pub mod price_target;
pub mod red_flags;
pub mod sector_medians;

pub use config::{BuyMargins, ComponentWeights, DcfConfig, DefaultMedians, OutlierConfig, PriceTargetConfig};
pub use dcf::{two_stage_dcf, DcfEstimate, DcfExclusion, DcfModel, DcfValuation};
pub use outliers::{detect_fundamental_outliers, OutlierReport, OutlierSummary};
pub use piotroski::{calculate_piotroski, PiotroskiResult, PiotroskiSignal, PiotroskiSignalKind};
pub use pillars::{quality_pillar, relative_pe, valuation_pillar};
pub use price_target::{
    calculate_price_targets, PriceTarget, PriceTargetDiagnostics, PriceTargetOutcome, ScoreContext,
};
pub use red_flags::red_flags;
pub use sector_medians::{
    calculate_sector_medians, get_sector_medians_for_stock, FallbackReason, MedianSelection, MedianSource,
    SectorMedianSet, SectorMedians,
};
