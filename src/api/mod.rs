use std::time::Duration;

use crate::document::DocumentNode;
use crate::error::FetchError;
use crate::models::{MarketMetrics, ReportPeriod, ReportScope};

pub mod dart_client;
pub use dart_client::DartClient;

/// Which document a caller wants for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Semi-structured per-company financial summary page.
    Summary,
    /// One regulatory filing for a period/scope combination.
    Report {
        period: ReportPeriod,
        scope: ReportScope,
    },
}

impl DocumentKind {
    /// Container selector naming the region of interest inside documents of
    /// this kind.
    pub fn region_id(&self) -> &'static str {
        match self {
            DocumentKind::Summary => "snapshot",
            DocumentKind::Report { .. } => "finstate",
        }
    }
}

/// Document retrieval collaborator. Must be idempotent and safe to call
/// repeatedly; the fallback resolver may ask for several documents per
/// entity.
#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(
        &self,
        code: &str,
        year: i32,
        kind: DocumentKind,
    ) -> Result<DocumentNode, FetchError>;
}

/// Market listing collaborator. `Ok(None)` means the code is not listed.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn market_metrics(&self, code: &str) -> Result<Option<MarketMetrics>, FetchError>;
}

/// Injectable cache collaborator sitting behind the fetch interface. The
/// core treats it as an opaque pass-through; a miss is never an error.
#[async_trait::async_trait]
pub trait DocumentCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<DocumentNode>;
    async fn put(&self, key: &str, doc: &DocumentNode, ttl: Duration);
}

/// Default cache that stores nothing.
pub struct NoopCache;

#[async_trait::async_trait]
impl DocumentCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<DocumentNode> {
        None
    }

    async fn put(&self, _key: &str, _doc: &DocumentNode, _ttl: Duration) {}
}

/// Simple delay-based rate limiter for outbound API requests.
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_ids_distinguish_document_kinds() {
        assert_eq!(DocumentKind::Summary.region_id(), "snapshot");
        let report = DocumentKind::Report {
            period: ReportPeriod::Annual,
            scope: ReportScope::Consolidated,
        };
        assert_eq!(report.region_id(), "finstate");
    }

    #[tokio::test]
    async fn noop_cache_never_hits() {
        let cache = NoopCache;
        cache
            .put("k", &DocumentNode::root(), Duration::from_secs(60))
            .await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = ApiRateLimiter::new(6000); // 10ms between requests

        let start = std::time::Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
