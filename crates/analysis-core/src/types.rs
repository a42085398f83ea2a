use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence assigned to a value derived from other reported line items.
pub const DERIVED_CONFIDENCE: f64 = 0.8;

/// Confidence assigned to a value substituted from a neighbouring horizon
/// (e.g. 3-month volatility standing in for 12-month volatility).
pub const SUBSTITUTED_CONFIDENCE: f64 = 0.7;

/// Where a metric value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// Delivered by the data provider as-is
    Reported,
    /// Computed from other reported line items
    Derived,
    /// Filled from a sector statistic upstream
    SectorMedian,
    /// Filled with a static default upstream
    Default,
    /// No value available
    Missing,
}

/// One tagged numeric input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub value: Option<f64>,
    pub source: MetricSource,
    pub confidence: f64,
    #[serde(rename = "isImputed")]
    pub is_imputed: bool,
    #[serde(rename = "isMissing")]
    pub is_missing: bool,
}

impl MetricRecord {
    pub fn reported(value: f64) -> Self {
        Self {
            value: Some(value),
            source: MetricSource::Reported,
            confidence: 1.0,
            is_imputed: false,
            is_missing: false,
        }
    }

    pub fn imputed(value: f64, source: MetricSource, confidence: f64) -> Self {
        Self {
            value: Some(value),
            source,
            confidence: confidence.clamp(0.0, 1.0),
            is_imputed: true,
            is_missing: false,
        }
    }

    pub fn missing() -> Self {
        Self {
            value: None,
            source: MetricSource::Missing,
            confidence: 0.0,
            is_imputed: false,
            is_missing: true,
        }
    }

    /// Reported when finite, missing otherwise.
    pub fn from_option(value: Option<f64>) -> Self {
        match value.filter(|v| v.is_finite()) {
            Some(v) => Self::reported(v),
            None => Self::missing(),
        }
    }

    /// Apply an upstream provenance tag. Missing records stay missing.
    pub fn with_provenance(self, provenance: &MetricProvenance) -> Self {
        match self.value {
            Some(v) if provenance.source != MetricSource::Reported => {
                Self::imputed(v, provenance.source, provenance.confidence)
            }
            Some(_) => Self {
                confidence: provenance.confidence.clamp(0.0, 1.0),
                ..self
            },
            None => self,
        }
    }
}

/// Upstream tag for a reported field, keyed by field name on [`StockInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricProvenance {
    pub source: MetricSource,
    pub confidence: f64,
}

/// Raw line items for one fiscal period (Piotroski input).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialPeriod {
    pub fiscal_year: Option<i32>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub gross_profit: Option<f64>,
    pub revenue: Option<f64>,
    pub total_equity: Option<f64>,
}

/// Company fundamentals. Ratios and margins are decimal fractions (0.15 = 15%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ev_ebitda: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub roic: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub free_cash_flow: Option<f64>,
    /// Annual free cash flow to equity, oldest first
    pub free_cash_flow_history: Vec<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub market_cap: Option<f64>,
    pub revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub eps: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub revenue_per_share: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub total_equity: Option<f64>,
    pub current_period: Option<FinancialPeriod>,
    pub prior_period: Option<FinancialPeriod>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn per_share(total: Option<f64>, shares: Option<f64>) -> Option<f64> {
    match (finite(total), finite(shares)) {
        (Some(t), Some(s)) if s > 0.0 => Some(t / s),
        _ => None,
    }
}

impl Fundamentals {
    /// FCF / market cap, when both exist and market cap is positive.
    pub fn fcf_yield(&self) -> Option<f64> {
        match (finite(self.free_cash_flow), finite(self.market_cap)) {
            (Some(fcf), Some(cap)) if cap > 0.0 => Some(fcf / cap),
            _ => None,
        }
    }

    /// Book value per share: reported, else equity / shares.
    pub fn resolved_book_value_per_share(&self) -> Option<f64> {
        finite(self.book_value_per_share).or_else(|| self.derived_book_value_per_share())
    }

    /// Revenue per share: reported, else revenue / shares.
    pub fn resolved_revenue_per_share(&self) -> Option<f64> {
        finite(self.revenue_per_share).or_else(|| self.derived_revenue_per_share())
    }

    fn derived_book_value_per_share(&self) -> Option<f64> {
        per_share(self.total_equity, self.shares_outstanding)
    }

    fn derived_revenue_per_share(&self) -> Option<f64> {
        per_share(self.revenue, self.shares_outstanding)
    }
}

/// Price / return / volatility inputs. Returns and volatilities are decimal fractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalMetrics {
    pub current_price: Option<f64>,
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_12m: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    /// Annualized realized volatility over ~3 months
    pub volatility_3m: Option<f64>,
    /// Annualized realized volatility over ~12 months
    pub volatility_12m: Option<f64>,
    pub beta: Option<f64>,
    /// Peak-to-trough drawdown as a positive fraction
    pub max_drawdown: Option<f64>,
}

impl TechnicalMetrics {
    /// 12-month volatility, falling back to the 3-month figure.
    pub fn annual_volatility(&self) -> Option<f64> {
        finite(self.volatility_12m).or_else(|| finite(self.volatility_3m))
    }
}

/// One instrument of a frozen scoring batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInput {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub fundamentals: Fundamentals,
    #[serde(default)]
    pub technical: TechnicalMetrics,
    /// Optional upstream tags keyed by tracked field name (see [`TRACKED_FIELDS`])
    #[serde(default)]
    pub provenance: BTreeMap<String, MetricProvenance>,
}

/// A field assessed by the data-quality scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedField {
    pub name: &'static str,
    pub critical: bool,
}

const fn field(name: &'static str, critical: bool) -> TrackedField {
    TrackedField { name, critical }
}

/// Every input the scorer reads, in reporting order.
pub const TRACKED_FIELDS: &[TrackedField] = &[
    field("current_price", true),
    field("pe_ratio", true),
    field("pb_ratio", true),
    field("ps_ratio", false),
    field("ev_ebitda", false),
    field("roe", true),
    field("roa", false),
    field("gross_margin", false),
    field("operating_margin", false),
    field("debt_to_equity", true),
    field("current_ratio", false),
    field("free_cash_flow", false),
    field("market_cap", false),
    field("eps", false),
    field("book_value_per_share", false),
    field("revenue_per_share", false),
    field("return_3m", true),
    field("return_12m", false),
    field("sma_50", false),
    field("sma_200", false),
    field("volatility_12m", true),
    field("beta", false),
    field("max_drawdown", false),
];

/// Valuation inputs counted towards batch valuation coverage.
pub const VALUATION_FIELDS: &[&str] = &["pe_ratio", "pb_ratio", "ps_ratio", "ev_ebitda"];

impl StockInput {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            sector: None,
            industry: None,
            fundamentals: Fundamentals::default(),
            technical: TechnicalMetrics::default(),
            provenance: BTreeMap::new(),
        }
    }

    /// Sector name, trimmed; `None` when absent or blank.
    pub fn sector_key(&self) -> Option<&str> {
        self.sector.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Tag every tracked field, in [`TRACKED_FIELDS`] order.
    pub fn metric_records(&self) -> Vec<(&'static str, MetricRecord)> {
        TRACKED_FIELDS
            .iter()
            .map(|f| (f.name, self.metric_record(f.name)))
            .collect()
    }

    /// Share of [`VALUATION_FIELDS`] that are present (0.0 - 1.0).
    pub fn valuation_coverage(&self) -> f64 {
        let present = VALUATION_FIELDS
            .iter()
            .filter(|name| finite(self.reported_value(name)).is_some())
            .count();
        present as f64 / VALUATION_FIELDS.len() as f64
    }

    fn metric_record(&self, name: &str) -> MetricRecord {
        let record = match finite(self.reported_value(name)) {
            Some(v) => MetricRecord::reported(v),
            None => match self.substituted_value(name) {
                Some((v, confidence)) => MetricRecord::imputed(v, MetricSource::Derived, confidence),
                None => MetricRecord::missing(),
            },
        };
        match self.provenance.get(name) {
            Some(p) if record.source == MetricSource::Reported => record.with_provenance(p),
            _ => record,
        }
    }

    fn reported_value(&self, name: &str) -> Option<f64> {
        let f = &self.fundamentals;
        let t = &self.technical;
        match name {
            "current_price" => t.current_price,
            "pe_ratio" => f.pe_ratio,
            "pb_ratio" => f.pb_ratio,
            "ps_ratio" => f.ps_ratio,
            "ev_ebitda" => f.ev_ebitda,
            "roe" => f.roe,
            "roa" => f.roa,
            "gross_margin" => f.gross_margin,
            "operating_margin" => f.operating_margin,
            "debt_to_equity" => f.debt_to_equity,
            "current_ratio" => f.current_ratio,
            "free_cash_flow" => f.free_cash_flow,
            "market_cap" => f.market_cap,
            "eps" => f.eps,
            "book_value_per_share" => f.book_value_per_share,
            "revenue_per_share" => f.revenue_per_share,
            "return_3m" => t.return_3m,
            "return_12m" => t.return_12m,
            "sma_50" => t.sma_50,
            "sma_200" => t.sma_200,
            "volatility_12m" => t.volatility_12m,
            "beta" => t.beta,
            "max_drawdown" => t.max_drawdown,
            _ => None,
        }
    }

    fn substituted_value(&self, name: &str) -> Option<(f64, f64)> {
        let f = &self.fundamentals;
        match name {
            "book_value_per_share" => f.derived_book_value_per_share().map(|v| (v, DERIVED_CONFIDENCE)),
            "revenue_per_share" => f.derived_revenue_per_share().map(|v| (v, DERIVED_CONFIDENCE)),
            "volatility_12m" => finite(self.technical.volatility_3m).map(|v| (v, SUBSTITUTED_CONFIDENCE)),
            _ => None,
        }
    }
}

/// Four pillar scores, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarEvidence {
    pub valuation: f64,
    pub quality: f64,
    pub technical: f64,
    pub risk: f64,
}

impl PillarEvidence {
    pub fn values(&self) -> [f64; 4] {
        [self.valuation, self.quality, self.technical, self.risk]
    }

    /// Distance between the strongest and weakest pillar.
    pub fn spread(&self) -> f64 {
        let values = self.values();
        let max = values.iter().copied().fold(f64::MIN, f64::max);
        let min = values.iter().copied().fold(f64::MAX, f64::min);
        max - min
    }
}

/// Three-tier confidence label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// One tier lower; `Low` stays `Low`.
    pub fn downgrade(self) -> Self {
        match self {
            ConfidenceLevel::High => ConfidenceLevel::Medium,
            ConfidenceLevel::Medium | ConfidenceLevel::Low => ConfidenceLevel::Low,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}
