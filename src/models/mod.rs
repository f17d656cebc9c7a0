use serde::{Deserialize, Serialize};

/// A normalized financial-statement line item, independent of how a given
/// filer labels it in a given period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalConcept {
    TotalAssets,
    TotalLiabilities,
    TotalEquity,
    CurrentAssets,
    RetainedEarnings,
    CashAndEquivalents,
    ShortTermFinancialAssets,
    NetIncome,
}

impl CanonicalConcept {
    pub const ALL: [CanonicalConcept; 8] = [
        CanonicalConcept::TotalAssets,
        CanonicalConcept::TotalLiabilities,
        CanonicalConcept::TotalEquity,
        CanonicalConcept::CurrentAssets,
        CanonicalConcept::RetainedEarnings,
        CanonicalConcept::CashAndEquivalents,
        CanonicalConcept::ShortTermFinancialAssets,
        CanonicalConcept::NetIncome,
    ];

    /// Human-readable name used in diagnostics and log output.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalConcept::TotalAssets => "total assets",
            CanonicalConcept::TotalLiabilities => "total liabilities",
            CanonicalConcept::TotalEquity => "total equity",
            CanonicalConcept::CurrentAssets => "current assets",
            CanonicalConcept::RetainedEarnings => "retained earnings",
            CanonicalConcept::CashAndEquivalents => "cash and equivalents",
            CanonicalConcept::ShortTermFinancialAssets => "short-term financial assets",
            CanonicalConcept::NetIncome => "net income",
        }
    }
}

/// Whether reported figures include subsidiaries or the parent entity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportScope {
    Consolidated,
    Standalone,
}

/// Report period for a filing. Variant order here is the fallback search
/// order (widest coverage first), not calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportPeriod {
    Annual,
    Q3,
    H1,
    Q1,
}

impl ReportPeriod {
    pub const FALLBACK_ORDER: [ReportPeriod; 4] = [
        ReportPeriod::Annual,
        ReportPeriod::Q3,
        ReportPeriod::H1,
        ReportPeriod::Q1,
    ];

    pub fn is_interim(&self) -> bool {
        !matches!(self, ReportPeriod::Annual)
    }

    /// Report code used by the OpenDART-style filing API.
    pub fn report_code(&self) -> &'static str {
        match self {
            ReportPeriod::Annual => "11011",
            ReportPeriod::H1 => "11012",
            ReportPeriod::Q1 => "11013",
            ReportPeriod::Q3 => "11014",
        }
    }
}

/// Identifies one concrete report artifact (fiscal year + period + scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRef {
    pub fiscal_year: i32,
    pub period: ReportPeriod,
    pub scope: ReportScope,
}

/// Per-concept value triple: [current year, year-1, year-2], in won.
///
/// 0 doubles as the missing-value sentinel, so a true zero is
/// indistinguishable from "not reported". This is a documented trade-off
/// inherited from the source data; all downstream ratio math treats
/// non-positive denominators as "return 0" to match.
pub type ValueTriple = [i64; 3];

/// Reconciled three-year fact set for one entity and target fiscal year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactRecord {
    pub fiscal_year: i32,
    /// Report that supplied the current-year column.
    pub source: ReportRef,
    /// Prior-year annual report used for comparative columns, when the
    /// primary source was an interim report.
    pub secondary_source: Option<ReportRef>,
    pub assets: ValueTriple,
    pub liabilities: ValueTriple,
    pub equity: ValueTriple,
    pub current_assets: ValueTriple,
    pub retained_earnings: ValueTriple,
    pub cash_and_equivalents: ValueTriple,
    pub short_term_financial_assets: ValueTriple,
    pub net_income: ValueTriple,
}

impl FactRecord {
    pub fn empty(fiscal_year: i32, source: ReportRef, secondary_source: Option<ReportRef>) -> Self {
        Self {
            fiscal_year,
            source,
            secondary_source,
            assets: [0; 3],
            liabilities: [0; 3],
            equity: [0; 3],
            current_assets: [0; 3],
            retained_earnings: [0; 3],
            cash_and_equivalents: [0; 3],
            short_term_financial_assets: [0; 3],
            net_income: [0; 3],
        }
    }

    pub fn get(&self, concept: CanonicalConcept) -> ValueTriple {
        match concept {
            CanonicalConcept::TotalAssets => self.assets,
            CanonicalConcept::TotalLiabilities => self.liabilities,
            CanonicalConcept::TotalEquity => self.equity,
            CanonicalConcept::CurrentAssets => self.current_assets,
            CanonicalConcept::RetainedEarnings => self.retained_earnings,
            CanonicalConcept::CashAndEquivalents => self.cash_and_equivalents,
            CanonicalConcept::ShortTermFinancialAssets => self.short_term_financial_assets,
            CanonicalConcept::NetIncome => self.net_income,
        }
    }

    pub fn slot_mut(&mut self, concept: CanonicalConcept) -> &mut ValueTriple {
        match concept {
            CanonicalConcept::TotalAssets => &mut self.assets,
            CanonicalConcept::TotalLiabilities => &mut self.liabilities,
            CanonicalConcept::TotalEquity => &mut self.equity,
            CanonicalConcept::CurrentAssets => &mut self.current_assets,
            CanonicalConcept::RetainedEarnings => &mut self.retained_earnings,
            CanonicalConcept::CashAndEquivalents => &mut self.cash_and_equivalents,
            CanonicalConcept::ShortTermFinancialAssets => &mut self.short_term_financial_assets,
            CanonicalConcept::NetIncome => &mut self.net_income,
        }
    }
}

/// Market figures for one listed entity, as returned by the listing
/// collaborator. Prices and caps are in won.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub code: String,
    pub name: String,
    pub price: i64,
    pub market_cap: i64,
    pub shares_outstanding: i64,
    /// Trailing dividend yield in percent. Filled from the summary document
    /// when available; 0.0 otherwise.
    pub dividend_yield: f64,
}

/// Outcome of a single document fetch attempt, kept in diagnostics so
/// operators can tell "truly absent" apart from "could not check".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Used,
    Empty,
    NotFound,
    Malformed,
    Unreachable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAttempt {
    pub report: ReportRef,
    pub outcome: AttemptOutcome,
}

/// Diagnostic record attached to every reconciliation result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostic {
    /// False when at least one concept exhausted every alias in every
    /// selected table and fell back to the all-zero triple.
    pub complete: bool,
    pub unresolved: Vec<CanonicalConcept>,
    pub attempts: Vec<FetchAttempt>,
}

impl Diagnostic {
    pub fn summary(&self) -> String {
        if self.complete {
            "all concepts resolved".to_string()
        } else {
            let names: Vec<&str> = self.unresolved.iter().map(|c| c.label()).collect();
            format!("unresolved concepts: {}", names.join(", "))
        }
    }
}

/// Ratios derived from a reconciled fact record plus market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRatios {
    pub retained_rate: f64,
    pub cash_ratio: f64,
    pub roe: f64,
    pub pbr: f64,
    pub composite_score: f64,
}

/// One fiscal year of reconciled figures in display units (hundred million
/// won), with the per-year ratios the screening views consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearMetrics {
    pub year: i32,
    pub assets: i64,
    pub equity: i64,
    pub liabilities: i64,
    pub retained: i64,
    pub cash_equivalents: i64,
    pub current_assets: i64,
    pub net_income: i64,
    pub retained_rate: f64,
    pub cash_ratio: f64,
    pub roe: f64,
}

/// One company's reconciled facts, market data, and derived ratios.
/// Immutable once produced; owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub code: String,
    pub name: String,
    pub fiscal_year: i32,
    pub facts: FactRecord,
    pub market: MarketMetrics,
    pub ratios: DerivedRatios,
    pub history: Vec<YearMetrics>,
    pub diagnostic: Diagnostic,
}

/// Configuration for the screener, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub dart_api_key: String,
    pub dart_base_url: String,
    pub market_base_url: String,
    pub rate_limit_per_minute: u32,
    pub fetch_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            dart_api_key: std::env::var("DART_API_KEY")
                .map_err(|_| anyhow::anyhow!("DART_API_KEY environment variable required"))?,
            dart_base_url: std::env::var("DART_BASE_URL")
                .unwrap_or_else(|_| "https://opendart.fss.or.kr".to_string()),
            market_base_url: std::env::var("MARKET_BASE_URL")
                .unwrap_or_else(|_| "https://comp.fnguide.com".to_string()),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            fetch_concurrency: std::env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
        })
    }
}
