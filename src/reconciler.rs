//! Fact reconciliation for a single entity.
//!
//! Composes the period fallback resolver, the table extractor, and the
//! alias resolver across every canonical concept, then derives ratios and
//! the three-year history the screening views consume. A concept that
//! matches no alias can never fail the record; it is written as the
//! all-zero triple and reported through the diagnostic. The only terminal
//! failures are a missing market listing and total period exhaustion.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::aliases::{resolve_concept, resolve_labels};
use crate::api::{DocumentFetcher, DocumentKind, MarketDataProvider};
use crate::document::{extract_tables, RawTable};
use crate::error::ReconcileError;
use crate::models::{
    CanonicalConcept, DerivedRatios, Diagnostic, EntitySnapshot, FactRecord, MarketMetrics,
    ReportPeriod, ReportScope, YearMetrics,
};
use crate::period::{comparative_values, current_value, PeriodResolution, PeriodResolver, SlotPlan};
use crate::ratios;

/// Convert won to hundred-million-won display units.
fn to_100m(won: i64) -> i64 {
    (won as f64 / 100_000_000.0).round() as i64
}

pub struct Reconciler {
    fetcher: Arc<dyn DocumentFetcher>,
    market: Arc<dyn MarketDataProvider>,
}

impl Reconciler {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, market: Arc<dyn MarketDataProvider>) -> Self {
        Self { fetcher, market }
    }

    /// Reconcile one entity for one target fiscal year.
    ///
    /// Repeated calls with identical inputs against a stable document source
    /// yield identical snapshots.
    pub async fn reconcile_one(
        &self,
        code: &str,
        year: i32,
        scope: Option<ReportScope>,
    ) -> Result<EntitySnapshot, ReconcileError> {
        let mut market = match self.market.market_metrics(code).await {
            Ok(Some(m)) => m,
            Ok(None) => {
                return Err(ReconcileError::MarketDataMissing {
                    code: code.to_string(),
                })
            }
            Err(e) => {
                warn!("{}: market lookup failed: {}", code, e);
                return Err(ReconcileError::MarketDataMissing {
                    code: code.to_string(),
                });
            }
        };

        let resolution = PeriodResolver::new(self.fetcher.as_ref())
            .resolve(code, year, scope)
            .await?;

        let (facts, unresolved) = build_fact_record(&resolution, year);
        let diagnostic = Diagnostic {
            complete: unresolved.is_empty(),
            unresolved,
            attempts: resolution.attempts,
        };
        if !diagnostic.complete {
            info!("{}: partial reconciliation, {}", code, diagnostic.summary());
        }

        if let Some(dy) = self.fetch_dividend_yield(code, year).await {
            market.dividend_yield = dy;
        }

        Ok(build_snapshot(code, market, facts, diagnostic))
    }

    /// Best-effort dividend yield from the per-company summary document.
    /// Any failure here degrades to "no yield data", never to an error.
    async fn fetch_dividend_yield(&self, code: &str, year: i32) -> Option<f64> {
        let doc = match self.fetcher.fetch(code, year, DocumentKind::Summary).await {
            Ok(doc) => doc,
            Err(e) => {
                debug!("{}: summary document unavailable: {}", code, e);
                return None;
            }
        };
        let table = extract_tables(&doc, &[DocumentKind::Summary.region_id()])
            .into_iter()
            .find(|t| !t.is_empty())?;
        dividend_yield_from(&table)
    }
}

fn dividend_yield_from(table: &RawTable) -> Option<f64> {
    resolve_labels(table, &["배당수익률"])
        .and_then(|values| values.iter().find(|v| !v.is_missing()))
        .map(|v| match v {
            crate::document::RawValue::Num(n) => *n,
            crate::document::RawValue::Missing => 0.0,
        })
}

/// Fill the per-concept value triples from the tables the period resolver
/// selected, in fixed order: current-report table first, then the secondary
/// historical table where the slot plan uses one.
fn build_fact_record(res: &PeriodResolution, year: i32) -> (FactRecord, Vec<CanonicalConcept>) {
    let mut record = FactRecord::empty(
        year,
        res.primary.report,
        res.secondary.as_ref().map(|s| s.report),
    );
    let mut unresolved = Vec::new();
    let period = res.primary.report.period;

    for concept in CanonicalConcept::ALL {
        let primary = resolve_concept(&res.primary.table, concept);
        let slot = record.slot_mut(concept);

        match res.plan {
            SlotPlan::AnnualOnly | SlotPlan::InterimOnly => match primary {
                Some(values) => {
                    let (y1, y2) = comparative_values(values, period);
                    *slot = [current_value(values, period), y1, y2];
                }
                None => unresolved.push(concept),
            },
            SlotPlan::InterimWithPriorAnnual => {
                let secondary = res
                    .secondary
                    .as_ref()
                    .and_then(|s| resolve_concept(&s.table, concept));
                if primary.is_none() && secondary.is_none() {
                    unresolved.push(concept);
                    continue;
                }
                if let Some(values) = primary {
                    slot[0] = current_value(values, period);
                }
                if let Some(values) = secondary {
                    // The annual report's own current and prior columns are
                    // this record's year-1 and year-2.
                    let (y2, _) = comparative_values(values, ReportPeriod::Annual);
                    slot[1] = current_value(values, ReportPeriod::Annual);
                    slot[2] = y2;
                } else if let Some(values) = primary {
                    let (y1, y2) = comparative_values(values, period);
                    slot[1] = y1;
                    slot[2] = y2;
                }
            }
        }
    }

    (record, unresolved)
}

fn build_snapshot(
    code: &str,
    market: MarketMetrics,
    facts: FactRecord,
    diagnostic: Diagnostic,
) -> EntitySnapshot {
    let year = facts.fiscal_year;
    let history: Vec<YearMetrics> = (0..3)
        .map(|i| {
            let equity = facts.equity[i];
            let retained = facts.retained_earnings[i];
            let cash = facts.cash_and_equivalents[i];
            let short_term = facts.short_term_financial_assets[i];
            let current_assets = facts.current_assets[i];
            let net_income = facts.net_income[i];
            YearMetrics {
                year: year - i as i32,
                assets: to_100m(facts.assets[i]),
                equity: to_100m(equity),
                liabilities: to_100m(facts.liabilities[i]),
                retained: to_100m(retained),
                cash_equivalents: to_100m(cash + short_term),
                current_assets: to_100m(current_assets),
                net_income: to_100m(net_income),
                retained_rate: ratios::retained_earnings_ratio(retained, equity),
                cash_ratio: ratios::cash_ratio(cash, short_term, current_assets),
                roe: ratios::roe(net_income, equity),
            }
        })
        .collect();

    let equity_now = facts.equity[0];
    let pbr = ratios::pbr(market.market_cap, equity_now);
    let roe_now = history[0].roe;
    let ratios = DerivedRatios {
        retained_rate: history[0].retained_rate,
        cash_ratio: history[0].cash_ratio,
        roe: roe_now,
        pbr,
        composite_score: ratios::composite_score(pbr, market.dividend_yield, roe_now),
    };

    EntitySnapshot {
        code: code.to_string(),
        name: market.name.clone(),
        fiscal_year: year,
        facts,
        market,
        ratios,
        history,
        diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentNode, RawValue};
    use crate::error::FetchError;
    use crate::models::ReportRef;
    use crate::period::SelectedReport;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn statement_table(rows: &[(&str, &[i64])]) -> RawTable {
        let mut t = RawTable::new();
        for (label, vals) in rows {
            t.push_row(
                label.to_string(),
                vals.iter().map(|v| RawValue::Num(*v as f64)).collect(),
            );
        }
        t
    }

    fn annual_ref(year: i32) -> ReportRef {
        ReportRef {
            fiscal_year: year,
            period: ReportPeriod::Annual,
            scope: ReportScope::Consolidated,
        }
    }

    #[test]
    fn annual_plan_fills_all_three_slots() {
        let res = PeriodResolution {
            primary: SelectedReport {
                report: annual_ref(2024),
                table: statement_table(&[
                    ("자본총계", &[500, 450, 400]),
                    ("자산총계", &[900, 850, 800]),
                ]),
            },
            secondary: None,
            plan: SlotPlan::AnnualOnly,
            attempts: Vec::new(),
        };

        let (record, unresolved) = build_fact_record(&res, 2024);
        assert_eq!(record.equity, [500, 450, 400]);
        assert_eq!(record.assets, [900, 850, 800]);
        // Every other concept falls back to the all-zero triple.
        assert_eq!(record.net_income, [0, 0, 0]);
        assert_eq!(unresolved.len(), 6);
    }

    #[test]
    fn interim_plan_splits_slots_between_reports() {
        let interim = ReportRef {
            fiscal_year: 2024,
            period: ReportPeriod::Q3,
            scope: ReportScope::Consolidated,
        };
        let res = PeriodResolution {
            primary: SelectedReport {
                report: interim,
                // [single, accumulated, prior, prior-prior]
                table: statement_table(&[("자본총계", &[120, 480, 9999, 9999])]),
            },
            secondary: Some(SelectedReport {
                report: annual_ref(2023),
                table: statement_table(&[("자본총계", &[450, 400, 350])]),
            }),
            plan: SlotPlan::InterimWithPriorAnnual,
            attempts: Vec::new(),
        };

        let (record, unresolved) = build_fact_record(&res, 2024);
        // Current from the interim accumulated column; comparatives from the
        // prior annual's current/prior columns, not the interim's own.
        assert_eq!(record.equity, [480, 450, 400]);
        assert!(unresolved.contains(&CanonicalConcept::NetIncome));
    }

    #[test]
    fn interim_only_plan_uses_comparative_columns() {
        let interim = ReportRef {
            fiscal_year: 2024,
            period: ReportPeriod::H1,
            scope: ReportScope::Standalone,
        };
        let res = PeriodResolution {
            primary: SelectedReport {
                report: interim,
                table: statement_table(&[("자본총계", &[120, 480, 430, 380])]),
            },
            secondary: None,
            plan: SlotPlan::InterimOnly,
            attempts: Vec::new(),
        };

        let (record, _) = build_fact_record(&res, 2024);
        assert_eq!(record.equity, [480, 430, 380]);
    }

    #[test]
    fn snapshot_derives_ratios_and_display_history() {
        let mut record = FactRecord::empty(2024, annual_ref(2024), None);
        record.equity = [500_000_000_000, 450_000_000_000, 400_000_000_000];
        record.retained_earnings = [250_000_000_000, 200_000_000_000, 150_000_000_000];
        record.cash_and_equivalents = [30_000_000_000, 20_000_000_000, 10_000_000_000];
        record.short_term_financial_assets = [20_000_000_000, 10_000_000_000, 0];
        record.current_assets = [100_000_000_000, 90_000_000_000, 80_000_000_000];
        record.net_income = [50_000_000_000, 40_000_000_000, 30_000_000_000];

        let market = MarketMetrics {
            code: "005930".to_string(),
            name: "테스트전자".to_string(),
            price: 70_000,
            market_cap: 1_000_000_000_000,
            shares_outstanding: 14_285_714,
            dividend_yield: 2.0,
        };

        let snapshot = build_snapshot("005930", market, record, Diagnostic::default());

        assert_eq!(snapshot.ratios.pbr, 2.0);
        assert_eq!(snapshot.ratios.roe, 10.0);
        assert_eq!(snapshot.ratios.retained_rate, 50.0);
        assert_eq!(snapshot.ratios.cash_ratio, 50.0);
        // (3 - 2) * 30 + 2 * 5 + 10 * 1.5
        assert_eq!(snapshot.ratios.composite_score, 55.0);

        assert_eq!(snapshot.history.len(), 3);
        assert_eq!(snapshot.history[0].year, 2024);
        assert_eq!(snapshot.history[0].equity, 5_000);
        assert_eq!(snapshot.history[2].year, 2022);
        assert_eq!(snapshot.history[2].equity, 4_000);
    }

    struct EmptyFetcher;

    #[async_trait::async_trait]
    impl DocumentFetcher for EmptyFetcher {
        async fn fetch(
            &self,
            _code: &str,
            _year: i32,
            _kind: DocumentKind,
        ) -> Result<DocumentNode, FetchError> {
            Err(FetchError::NotFound)
        }
    }

    struct FixtureMarket {
        listings: HashMap<String, MarketMetrics>,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for FixtureMarket {
        async fn market_metrics(&self, code: &str) -> Result<Option<MarketMetrics>, FetchError> {
            Ok(self.listings.get(code).cloned())
        }
    }

    #[tokio::test]
    async fn unlisted_entity_fails_with_market_data_missing() {
        let reconciler = Reconciler::new(
            Arc::new(EmptyFetcher),
            Arc::new(FixtureMarket {
                listings: HashMap::new(),
            }),
        );

        let err = reconciler.reconcile_one("999999", 2024, None).await.unwrap_err();
        assert!(matches!(err, ReconcileError::MarketDataMissing { .. }));
    }

    #[test]
    fn dividend_yield_read_from_summary_table() {
        let mut table = RawTable::new();
        table.push_row("PER".to_string(), vec![RawValue::Num(12.3)]);
        table.push_row(
            "배당수익률".to_string(),
            vec![RawValue::Missing, RawValue::Num(2.15)],
        );
        assert_eq!(dividend_yield_from(&table), Some(2.15));

        let empty = RawTable::new();
        assert_eq!(dividend_yield_from(&empty), None);
    }
}
