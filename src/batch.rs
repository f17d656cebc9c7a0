//! Concurrent batch reconciliation over a bounded task group.
//!
//! Each entity is reconciled in its own spawned task with no shared mutable
//! state; `buffer_unordered` bounds how many run at once. A task failure is
//! captured at the task boundary and recorded against that entity id only,
//! so a batch always returns a verdict for every requested entity.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::ReconcileError;
use crate::models::{EntitySnapshot, ReportScope};
use crate::reconciler::Reconciler;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub fiscal_year: i32,
    pub scope: Option<ReportScope>,
    pub concurrency: usize,
}

impl BatchConfig {
    pub fn new(fiscal_year: i32) -> Self {
        Self {
            fiscal_year,
            scope: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Outcome of a batch run. Every input entity id appears in exactly one of
/// the two lists.
#[derive(Debug)]
pub struct BatchResult {
    pub snapshots: Vec<EntitySnapshot>,
    pub failures: Vec<(String, ReconcileError)>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.snapshots.len() + self.failures.len()
    }
}

/// Reconcile every entity in `codes` with at most `config.concurrency`
/// in-flight tasks. Never aborts on a per-entity failure.
pub async fn reconcile_batch(
    reconciler: Arc<Reconciler>,
    codes: Vec<String>,
    config: BatchConfig,
) -> BatchResult {
    let total = codes.len();
    let concurrency = config.concurrency.max(1);
    info!(
        "Starting batch reconciliation of {} entities for FY{} ({} workers)",
        total, config.fiscal_year, concurrency
    );

    let outcomes: Vec<(String, Result<EntitySnapshot, ReconcileError>)> = stream::iter(codes)
        .map(|code| {
            let reconciler = Arc::clone(&reconciler);
            let config = config.clone();
            async move {
                let task_code = code.clone();
                let handle = tokio::spawn(async move {
                    reconciler
                        .reconcile_one(&task_code, config.fiscal_year, config.scope)
                        .await
                });
                let outcome = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(ReconcileError::Unexpected(join_err.to_string())),
                };
                (code, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut snapshots = Vec::new();
    let mut failures = Vec::new();
    for (code, outcome) in outcomes {
        match outcome {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                warn!("{}: reconciliation failed: {}", code, e);
                failures.push((code, e));
            }
        }
    }

    info!(
        "Batch complete: {} reconciled, {} failed",
        snapshots.len(),
        failures.len()
    );
    BatchResult {
        snapshots,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DocumentFetcher, DocumentKind, MarketDataProvider};
    use crate::document::DocumentNode;
    use crate::error::FetchError;
    use crate::models::{MarketMetrics, ReportPeriod, ReportScope};
    use pretty_assertions::assert_eq;
    use std::collections::{HashMap, HashSet};

    /// Serves the same annual consolidated statement for a fixed set of
    /// entities; everything else is NotFound.
    struct FixtureFetcher {
        known: HashSet<String>,
    }

    #[async_trait::async_trait]
    impl DocumentFetcher for FixtureFetcher {
        async fn fetch(
            &self,
            code: &str,
            _year: i32,
            kind: DocumentKind,
        ) -> Result<DocumentNode, FetchError> {
            let is_annual_consolidated = matches!(
                kind,
                DocumentKind::Report {
                    period: ReportPeriod::Annual,
                    scope: ReportScope::Consolidated,
                }
            );
            if !is_annual_consolidated || !self.known.contains(code) {
                return Err(FetchError::NotFound);
            }
            let rows = [
                ("자산총계", ["900", "850", "800"]),
                ("부채총계", ["400", "380", "360"]),
                ("자본총계", ["500", "450", "400"]),
                ("유동자산", ["200", "190", "180"]),
                ("이익잉여금", ["250", "200", "150"]),
                ("현금및현금성자산", ["50", "40", "30"]),
                ("단기금융상품", ["20", "10", "5"]),
                ("당기순이익", ["50", "40", "30"]),
            ];
            let mut region = DocumentNode::region("finstate");
            for (label, cells) in rows {
                let mut row = DocumentNode::row().with_child(DocumentNode::cell(label));
                for cell in cells {
                    row = row.with_child(DocumentNode::cell(cell));
                }
                region = region.with_child(row);
            }
            Ok(DocumentNode::root().with_child(region))
        }
    }

    struct FixtureMarket {
        listings: HashMap<String, MarketMetrics>,
    }

    impl FixtureMarket {
        fn with_codes(codes: &[&str]) -> Self {
            let listings = codes
                .iter()
                .map(|code| {
                    (
                        code.to_string(),
                        MarketMetrics {
                            code: code.to_string(),
                            name: format!("기업{}", code),
                            price: 10_000,
                            market_cap: 1_000,
                            shares_outstanding: 100,
                            dividend_yield: 0.0,
                        },
                    )
                })
                .collect();
            Self { listings }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for FixtureMarket {
        async fn market_metrics(&self, code: &str) -> Result<Option<MarketMetrics>, FetchError> {
            Ok(self.listings.get(code).cloned())
        }
    }

    fn reconciler_for(known: &[&str], listed: &[&str]) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            Arc::new(FixtureFetcher {
                known: known.iter().map(|s| s.to_string()).collect(),
            }),
            Arc::new(FixtureMarket::with_codes(listed)),
        ))
    }

    #[tokio::test]
    async fn batch_partition_is_exhaustive_and_exclusive() {
        let reconciler = reconciler_for(
            &["000100", "000200"],
            &["000100", "000200", "000300"],
        );
        let codes: Vec<String> = ["000100", "000200", "000300"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = reconcile_batch(reconciler, codes.clone(), BatchConfig::new(2024)).await;

        assert_eq!(result.total(), codes.len());
        let succeeded: HashSet<&str> = result.snapshots.iter().map(|s| s.code.as_str()).collect();
        let failed: HashSet<&str> = result.failures.iter().map(|(c, _)| c.as_str()).collect();
        assert!(succeeded.is_disjoint(&failed));
        let mut all: Vec<&str> = succeeded.union(&failed).copied().collect();
        all.sort();
        assert_eq!(all, vec!["000100", "000200", "000300"]);

        // 000300 is listed but files nothing: Exhausted, not MarketDataMissing.
        let (_, reason) = result
            .failures
            .iter()
            .find(|(c, _)| c == "000300")
            .unwrap();
        assert!(matches!(reason, ReconcileError::Exhausted { .. }));
    }

    #[tokio::test]
    async fn one_failure_never_affects_sibling_entities() {
        let reconciler = reconciler_for(&["000100"], &["000100"]);
        let codes: Vec<String> = ["999999", "000100"].iter().map(|s| s.to_string()).collect();

        let result = reconcile_batch(reconciler, codes, BatchConfig::new(2024)).await;

        assert_eq!(result.snapshots.len(), 1);
        assert_eq!(result.snapshots[0].code, "000100");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0, "999999");
    }

    #[tokio::test]
    async fn concurrency_of_one_still_processes_everything() {
        let reconciler = reconciler_for(&["000100", "000200"], &["000100", "000200"]);
        let codes: Vec<String> = ["000100", "000200"].iter().map(|s| s.to_string()).collect();

        let mut config = BatchConfig::new(2024);
        config.concurrency = 1;
        let result = reconcile_batch(reconciler, codes, config).await;

        assert_eq!(result.snapshots.len(), 2);
        assert!(result.failures.is_empty());
    }
}
