//! Period fallback resolution.
//!
//! Filers do not reliably publish every report: the annual filing may be
//! months away while a quarterly one exists, a consolidated statement may be
//! absent where a standalone one is filed, and interim reports often carry
//! incomplete comparative columns. This module walks the fallback chain
//! Annual -> Q3 -> H1 -> Q1 (Consolidated preferred over Standalone per
//! report) until a non-empty statement table is obtained, then decides which
//! report supplies which of the three year slots.

use tracing::{debug, warn};

use crate::api::{DocumentFetcher, DocumentKind};
use crate::document::{extract_tables, RawTable, RawValue};
use crate::error::{FetchError, ReconcileError};
use crate::models::{AttemptOutcome, FetchAttempt, ReportPeriod, ReportRef, ReportScope};

/// Column conventions for statement tables, by report type:
///
/// - Annual rows:  `[current, prior, prior-prior]`
/// - Interim rows: `[single-period, accumulated, prior, prior-prior]`
///
/// Interim current-value selection prefers the accumulated-to-date column
/// when it is present and non-empty.
pub fn current_value(values: &[RawValue], period: ReportPeriod) -> i64 {
    if period.is_interim() {
        match values.get(1) {
            Some(v) if !v.is_missing() => v.amount(),
            _ => values.first().map(|v| v.amount()).unwrap_or(0),
        }
    } else {
        values.first().map(|v| v.amount()).unwrap_or(0)
    }
}

/// Year-1 and year-2 comparative columns of a row, per the same convention.
/// Short rows (interim reports with dropped comparatives) yield zeros.
pub fn comparative_values(values: &[RawValue], period: ReportPeriod) -> (i64, i64) {
    let base = if period.is_interim() { 2 } else { 1 };
    let y1 = values.get(base).map(|v| v.amount()).unwrap_or(0);
    let y2 = values.get(base + 1).map(|v| v.amount()).unwrap_or(0);
    (y1, y2)
}

/// How the three FactRecord slots are filled from the selected reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPlan {
    /// Annual primary: its current/prior/prior-prior columns fill all slots.
    AnnualOnly,
    /// Interim primary plus prior-year annual secondary: the current slot
    /// comes from the interim table, year-1/year-2 from the annual's
    /// current and prior columns.
    InterimWithPriorAnnual,
    /// Interim primary only: its own comparative columns fill year-1/year-2.
    InterimOnly,
}

/// A report that yielded a usable statement table.
#[derive(Debug)]
pub struct SelectedReport {
    pub report: ReportRef,
    pub table: RawTable,
}

/// Result of walking the fallback chain for one entity/year.
#[derive(Debug)]
pub struct PeriodResolution {
    pub primary: SelectedReport,
    pub secondary: Option<SelectedReport>,
    pub plan: SlotPlan,
    pub attempts: Vec<FetchAttempt>,
}

pub struct PeriodResolver<'a> {
    fetcher: &'a dyn DocumentFetcher,
}

impl<'a> PeriodResolver<'a> {
    pub fn new(fetcher: &'a dyn DocumentFetcher) -> Self {
        Self { fetcher }
    }

    /// Walk the fallback chain for `code`/`year`. A scope override restricts
    /// every fetch to that scope (no Consolidated -> Standalone fallback).
    ///
    /// Fetch failures of any kind advance the chain; the only error surfaced
    /// is total exhaustion.
    pub async fn resolve(
        &self,
        code: &str,
        year: i32,
        scope_override: Option<ReportScope>,
    ) -> Result<PeriodResolution, ReconcileError> {
        let mut attempts = Vec::new();

        for period in ReportPeriod::FALLBACK_ORDER {
            let selected = self
                .try_report(code, year, period, scope_override, &mut attempts)
                .await;
            let Some(primary) = selected else { continue };

            if !period.is_interim() {
                return Ok(PeriodResolution {
                    primary,
                    secondary: None,
                    plan: SlotPlan::AnnualOnly,
                    attempts,
                });
            }

            // Interim comparative columns are frequently incomplete or
            // differently scoped, so year-1/year-2 come from the prior
            // fiscal year's annual report when it can be fetched.
            let secondary = self
                .try_report(code, year - 1, ReportPeriod::Annual, scope_override, &mut attempts)
                .await;
            let plan = if secondary.is_some() {
                SlotPlan::InterimWithPriorAnnual
            } else {
                warn!(
                    "{}: prior-year annual unavailable, using FY{} {:?} comparative columns",
                    code, year, period
                );
                SlotPlan::InterimOnly
            };
            return Ok(PeriodResolution {
                primary,
                secondary,
                plan,
                attempts,
            });
        }

        Err(ReconcileError::Exhausted {
            code: code.to_string(),
            year,
            attempts: attempts.len(),
        })
    }

    /// Try one report period for one year, Consolidated first unless a scope
    /// override pins the scope. Returns the first scope that yields a
    /// non-empty statement table.
    async fn try_report(
        &self,
        code: &str,
        year: i32,
        period: ReportPeriod,
        scope_override: Option<ReportScope>,
        attempts: &mut Vec<FetchAttempt>,
    ) -> Option<SelectedReport> {
        let scopes: &[ReportScope] = match scope_override {
            Some(ReportScope::Consolidated) => &[ReportScope::Consolidated],
            Some(ReportScope::Standalone) => &[ReportScope::Standalone],
            None => &[ReportScope::Consolidated, ReportScope::Standalone],
        };

        for &scope in scopes {
            let report = ReportRef {
                fiscal_year: year,
                period,
                scope,
            };
            let kind = DocumentKind::Report { period, scope };
            let outcome = match self.fetcher.fetch(code, year, kind).await {
                Ok(doc) => {
                    let table = extract_tables(&doc, &[kind.region_id()])
                        .into_iter()
                        .find(|t| !t.is_empty());
                    match table {
                        Some(table) => {
                            debug!("{}: using FY{} {:?} {:?} ({} rows)", code, year, period, scope, table.len());
                            attempts.push(FetchAttempt {
                                report,
                                outcome: AttemptOutcome::Used,
                            });
                            return Some(SelectedReport { report, table });
                        }
                        None => AttemptOutcome::Empty,
                    }
                }
                Err(FetchError::NotFound) => AttemptOutcome::NotFound,
                Err(FetchError::Malformed(msg)) => {
                    warn!("{}: FY{} {:?} {:?} malformed: {}", code, year, period, scope, msg);
                    AttemptOutcome::Malformed
                }
                Err(FetchError::Unreachable(msg)) => {
                    warn!("{}: FY{} {:?} {:?} unreachable: {}", code, year, period, scope, msg);
                    AttemptOutcome::Unreachable(msg)
                }
            };
            attempts.push(FetchAttempt { report, outcome });
        }
        None
    }
}
