//! Batch-level PE/PB/PS medians per sector, with a global fallback.
//!
//! The median set is an explicit value built once from the complete batch and
//! passed into each per-symbol call.

use crate::config::PriceTargetConfig;
use analysis_core::stats::median;
use analysis_core::StockInput;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorMedians {
    pub median_pe: Option<f64>,
    pub median_pb: Option<f64>,
    pub median_ps: Option<f64>,
    /// Stocks in the group, whether or not they had usable ratios
    pub sample_size: usize,
    /// Usable values behind each median
    pub pe_count: usize,
    pub pb_count: usize,
    pub ps_count: usize,
}

impl SectorMedians {
    /// Enough peers for sector-relative valuation.
    ///
    /// Every ratio the group reports at all needs `min_sample` usable values,
    /// and at least one ratio must be reported. A ratio nobody in the group
    /// reports is filled from the global set instead.
    pub fn is_usable(&self, min_sample: usize) -> bool {
        let counts = [self.pe_count, self.pb_count, self.ps_count];
        counts.iter().any(|&n| n > 0) && counts.iter().all(|&n| n == 0 || n >= min_sample)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorMedianSet {
    pub sectors: BTreeMap<String, SectorMedians>,
    pub global: SectorMedians,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianSource {
    Sector,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    SectorSampleTooSmall,
    MissingSector,
}

/// Where one resolved median value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianOrigin {
    Sector,
    Global,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMedian {
    pub value: f64,
    pub origin: MedianOrigin,
    /// Values behind the median, 0 for a configured default
    pub sample_size: usize,
}

/// The medians chosen for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianSelection {
    pub source: MedianSource,
    pub fallback_reason: Option<FallbackReason>,
    pub sector: Option<String>,
    /// Size of the stock's sector group (0 when the sector is missing)
    pub sample_size: usize,
    pub pe: ResolvedMedian,
    pub pb: ResolvedMedian,
    pub ps: ResolvedMedian,
}

impl MedianSelection {
    pub fn is_fallback(&self) -> bool {
        self.source == MedianSource::Global
    }
}

fn usable_ratio(value: Option<f64>, ceiling: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0 && *v <= ceiling)
}

fn medians_of<'a>(stocks: impl Iterator<Item = &'a StockInput>, ceiling: f64) -> SectorMedians {
    let mut pe = Vec::new();
    let mut pb = Vec::new();
    let mut ps = Vec::new();
    let mut sample_size = 0;

    for stock in stocks {
        sample_size += 1;
        let f = &stock.fundamentals;
        pe.extend(usable_ratio(f.pe_ratio, ceiling));
        pb.extend(usable_ratio(f.pb_ratio, ceiling));
        ps.extend(usable_ratio(f.ps_ratio, ceiling));
    }

    SectorMedians {
        median_pe: median(&pe),
        median_pb: median(&pb),
        median_ps: median(&ps),
        sample_size,
        pe_count: pe.len(),
        pb_count: pb.len(),
        ps_count: ps.len(),
    }
}

/// Group the batch by sector and compute per-sector and global medians.
///
/// Only positive ratios up to `config.max_ratio_for_median` enter a median.
/// Stocks without a sector count towards the global set only.
pub fn calculate_sector_medians(stocks: &[StockInput], config: &PriceTargetConfig) -> SectorMedianSet {
    let ceiling = config.max_ratio_for_median;

    let mut groups: BTreeMap<&str, Vec<&StockInput>> = BTreeMap::new();
    for stock in stocks {
        if let Some(sector) = stock.sector_key() {
            groups.entry(sector).or_default().push(stock);
        }
    }

    let sectors: BTreeMap<String, SectorMedians> = groups
        .into_iter()
        .map(|(sector, members)| (sector.to_string(), medians_of(members.into_iter(), ceiling)))
        .collect();

    let thin: Vec<&str> = sectors
        .iter()
        .filter(|(_, m)| !m.is_usable(config.min_sector_sample_size))
        .map(|(name, _)| name.as_str())
        .collect();
    if !thin.is_empty() {
        warn!(
            sectors = ?thin,
            min_sample = config.min_sector_sample_size,
            "Sectors below minimum sample size will use global medians"
        );
    }

    SectorMedianSet {
        sectors,
        global: medians_of(stocks.iter(), ceiling),
    }
}

fn resolve(sector: Option<(f64, usize)>, global: Option<(f64, usize)>, default: f64) -> ResolvedMedian {
    match (sector, global) {
        (Some((value, sample_size)), _) => ResolvedMedian {
            value,
            origin: MedianOrigin::Sector,
            sample_size,
        },
        (None, Some((value, sample_size))) => ResolvedMedian {
            value,
            origin: MedianOrigin::Global,
            sample_size,
        },
        (None, None) => ResolvedMedian {
            value: default,
            origin: MedianOrigin::Default,
            sample_size: 0,
        },
    }
}

fn with_count(value: Option<f64>, count: usize) -> Option<(f64, usize)> {
    value.map(|v| (v, count))
}

/// Pick the sector medians for `stock`, or fall back to the global set.
///
/// A sector set is used only when every ratio it reports has at least
/// `config.min_sector_sample_size` usable values (see
/// [`SectorMedians::is_usable`]). Individual ratios missing from the chosen
/// set are filled from the global set, then from the configured defaults.
pub fn get_sector_medians_for_stock(
    stock: &StockInput,
    set: &SectorMedianSet,
    config: &PriceTargetConfig,
) -> MedianSelection {
    let sector = stock.sector_key();
    let group = sector.and_then(|s| set.sectors.get(s));
    let sample_size = group.map(|g| g.sample_size).unwrap_or(0);

    let (source, fallback_reason, chosen) = match (sector, group) {
        (None, _) => (MedianSource::Global, Some(FallbackReason::MissingSector), None),
        (Some(_), Some(g)) if g.is_usable(config.min_sector_sample_size) => (MedianSource::Sector, None, Some(g)),
        (Some(_), _) => (MedianSource::Global, Some(FallbackReason::SectorSampleTooSmall), None),
    };

    if let Some(reason) = fallback_reason {
        debug!(symbol = %stock.symbol, ?reason, sample_size, "Using global medians");
    }

    let defaults = &config.default_medians;
    let global = &set.global;
    MedianSelection {
        source,
        fallback_reason,
        sector: sector.map(str::to_string),
        sample_size,
        pe: resolve(
            chosen.and_then(|g| with_count(g.median_pe, g.pe_count)),
            with_count(global.median_pe, global.pe_count),
            defaults.pe,
        ),
        pb: resolve(
            chosen.and_then(|g| with_count(g.median_pb, g.pb_count)),
            with_count(global.median_pb, global.pb_count),
            defaults.pb,
        ),
        ps: resolve(
            chosen.and_then(|g| with_count(g.median_ps, g.ps_count)),
            with_count(global.median_ps, global.ps_count),
            defaults.ps,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(symbol: &str, sector: Option<&str>, pe: f64, pb: f64) -> StockInput {
        let mut s = StockInput::new(symbol);
        s.sector = sector.map(str::to_string);
        s.fundamentals.pe_ratio = Some(pe);
        s.fundamentals.pb_ratio = Some(pb);
        s
    }

    #[test]
    fn test_sector_and_global_medians() {
        let stocks = vec![
            stock("A", Some("Tech"), 20.0, 4.0),
            stock("B", Some("Tech"), 30.0, 6.0),
            stock("C", Some("Tech"), -5.0, 5.0),
            stock("D", Some("Energy"), 8.0, 1.0),
            stock("E", None, 12.0, 2.0),
        ];
        let set = calculate_sector_medians(&stocks, &PriceTargetConfig::default());

        let tech = &set.sectors["Tech"];
        assert_eq!(tech.sample_size, 3);
        assert_eq!(tech.pe_count, 2);
        assert_eq!(tech.pb_count, 3);
        assert_eq!(tech.ps_count, 0);
        assert_eq!(tech.median_pe, Some(25.0));
        assert_eq!(tech.median_pb, Some(5.0));
        assert_eq!(tech.median_ps, None);

        assert_eq!(set.global.sample_size, 5);
        assert_eq!(set.global.median_pe, Some(16.0));
        assert!(!set.sectors.contains_key(""));
    }

    #[test]
    fn test_extreme_ratios_are_ignored() {
        let stocks = vec![stock("A", Some("Tech"), 20.0, 4.0), stock("B", Some("Tech"), 5_000.0, 4.0)];
        let set = calculate_sector_medians(&stocks, &PriceTargetConfig::default());
        assert_eq!(set.sectors["Tech"].median_pe, Some(20.0));
    }

    #[test]
    fn test_small_sector_falls_back_to_global() {
        let stocks: Vec<StockInput> = (0..3)
            .map(|i| stock(&format!("S{i}"), Some("Utilities"), 10.0 + i as f64, 1.0))
            .chain((0..4).map(|i| stock(&format!("T{i}"), Some("Tech"), 30.0, 6.0)))
            .collect();
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);

        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        assert_eq!(selection.source, MedianSource::Global);
        assert_eq!(selection.fallback_reason, Some(FallbackReason::SectorSampleTooSmall));
        assert_eq!(selection.sample_size, 3);
        assert_eq!(selection.pe.origin, MedianOrigin::Global);
        assert_eq!(selection.pe.value, 30.0);
        assert_eq!(selection.ps.origin, MedianOrigin::Default);
        assert_eq!(selection.ps.value, 2.0);
    }

    #[test]
    fn test_large_enough_sector_is_used() {
        let stocks: Vec<StockInput> = (0..5)
            .map(|i| stock(&format!("S{i}"), Some("Tech"), 20.0 + i as f64, 3.0))
            .collect();
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        assert_eq!(selection.source, MedianSource::Sector);
        assert_eq!(selection.fallback_reason, None);
        assert!(!selection.is_fallback());
        assert_eq!(selection.pe.value, 22.0);
        assert_eq!(selection.pe.origin, MedianOrigin::Sector);
        assert_eq!(selection.pe.sample_size, 5);
        // nobody reports PS: filled from the defaults without a fallback
        assert_eq!(selection.ps.origin, MedianOrigin::Default);
    }

    #[test]
    fn test_sector_with_one_usable_pe_falls_back() {
        let mut stocks: Vec<StockInput> = (0..5)
            .map(|i| {
                let mut s = StockInput::new(format!("T{i}"));
                s.sector = Some("Tech".to_string());
                s
            })
            .collect();
        stocks[0].fundamentals.pe_ratio = Some(90.0);
        stocks.extend((0..10).map(|i| stock(&format!("O{i}"), Some("Other"), 15.0, 2.0)));

        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        assert_eq!(set.sectors["Tech"].sample_size, 5);
        assert_eq!(set.sectors["Tech"].pe_count, 1);
        assert!(!set.sectors["Tech"].is_usable(config.min_sector_sample_size));

        let selection = get_sector_medians_for_stock(&stocks[1], &set, &config);
        assert_eq!(selection.source, MedianSource::Global);
        assert_eq!(selection.fallback_reason, Some(FallbackReason::SectorSampleTooSmall));
        assert!(selection.is_fallback());
        assert_eq!(selection.pe.origin, MedianOrigin::Global);
        assert_eq!(selection.pe.value, 15.0);
        assert_eq!(selection.pe.sample_size, 11);
    }

    #[test]
    fn test_sector_without_any_ratio_is_not_usable() {
        let empty = SectorMedians {
            sample_size: 6,
            ..Default::default()
        };
        assert!(!empty.is_usable(5));
    }

    #[test]
    fn test_missing_sector_reason() {
        let stocks = vec![stock("A", Some("  "), 20.0, 4.0)];
        let config = PriceTargetConfig::default();
        let set = calculate_sector_medians(&stocks, &config);
        let selection = get_sector_medians_for_stock(&stocks[0], &set, &config);
        assert_eq!(selection.fallback_reason, Some(FallbackReason::MissingSector));
        assert_eq!(selection.sample_size, 0);
        assert_eq!(selection.sector, None);
    }

    #[test]
    fn test_fallback_reason_wire_names() {
        let json = serde_json::to_string(&FallbackReason::SectorSampleTooSmall).unwrap();
        assert_eq!(json, "\"sector_sample_too_small\"");
        let json = serde_json::to_string(&FallbackReason::MissingSector).unwrap();
        assert_eq!(json, "\"missing_sector\"");
    }
}
