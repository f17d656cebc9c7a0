//! HTTP client for the OpenDART-style filing API and the market listing
//! endpoint. Implements the document and market collaborator traits the
//! reconciliation core consumes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::document::DocumentNode;
use crate::error::FetchError;
use crate::models::{Config, MarketMetrics, ReportScope};

use super::{ApiRateLimiter, DocumentCache, DocumentFetcher, DocumentKind, MarketDataProvider, NoopCache};

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Filing API response envelope. Status "000" is success, "013" is
/// "no data for this period".
#[derive(Debug, Deserialize)]
struct FinstateResponse {
    status: String,
    message: String,
    #[serde(default)]
    list: Vec<FinstateRow>,
}

#[derive(Debug, Deserialize)]
struct FinstateRow {
    fs_div: String,
    account_nm: String,
    #[serde(default)]
    thstrm_amount: Option<String>,
    #[serde(default)]
    thstrm_add_amount: Option<String>,
    #[serde(default)]
    frmtrm_amount: Option<String>,
    #[serde(default)]
    bfefrmtrm_amount: Option<String>,
}

/// Per-company summary snapshot (PER/PBR/dividend yield panel).
#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    items: Vec<SnapshotItem>,
}

#[derive(Debug, Deserialize)]
struct SnapshotItem {
    label: String,
    #[serde(default)]
    values: Vec<String>,
}

/// Market listing entry, mirroring the KRX listing column names.
#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Close")]
    close: i64,
    #[serde(rename = "Marcap")]
    marcap: i64,
    #[serde(rename = "Stocks")]
    stocks: i64,
}

fn scope_code(scope: ReportScope) -> &'static str {
    match scope {
        ReportScope::Consolidated => "CFS",
        ReportScope::Standalone => "OFS",
    }
}

pub struct DartClient {
    client: Client,
    api_key: String,
    dart_base: Url,
    market_base: Url,
    rate_limiter: ApiRateLimiter,
    cache: Arc<dyn DocumentCache>,
}

impl DartClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("value-screener/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.dart_api_key.clone(),
            dart_base: Url::parse(&config.dart_base_url)?,
            market_base: Url::parse(&config.market_base_url)?,
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
            cache: Arc::new(NoopCache),
        })
    }

    /// Install a cache collaborator in front of the network. The client
    /// treats it as pass-through; correctness never depends on it.
    pub fn with_cache(mut self, cache: Arc<dyn DocumentCache>) -> Self {
        self.cache = cache;
        self
    }

    fn cache_key(code: &str, year: i32, kind: DocumentKind) -> String {
        match kind {
            DocumentKind::Summary => format!("{}:snapshot", code),
            DocumentKind::Report { period, scope } => format!(
                "{}:{}:{}:{}",
                code,
                year,
                period.report_code(),
                scope_code(scope)
            ),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, FetchError> {
        self.rate_limiter.wait().await;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            status if !status.is_success() => {
                return Err(FetchError::Unreachable(format!("HTTP {}", status)))
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn fetch_report(
        &self,
        code: &str,
        year: i32,
        kind: DocumentKind,
    ) -> Result<DocumentNode, FetchError> {
        let DocumentKind::Report { period, scope } = kind else {
            return Err(FetchError::NotFound);
        };

        let mut url = self
            .dart_base
            .join("/api/fnlttSinglAcnt.json")
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("crtfc_key", &self.api_key)
            .append_pair("corp_code", code)
            .append_pair("bsns_year", &year.to_string())
            .append_pair("reprt_code", period.report_code());

        let body: FinstateResponse = self.get_json(url).await?;
        match body.status.as_str() {
            "000" => {}
            "013" => return Err(FetchError::NotFound),
            other => {
                return Err(FetchError::Unreachable(format!(
                    "filing API status {}: {}",
                    other, body.message
                )))
            }
        }

        let wanted = scope_code(scope);
        let rows: Vec<&FinstateRow> = body.list.iter().filter(|r| r.fs_div == wanted).collect();
        if rows.is_empty() {
            // The filing exists but not in this scope; the resolver will
            // retry with the other one.
            return Err(FetchError::NotFound);
        }

        let mut region = DocumentNode::region(kind.region_id());
        for entry in rows {
            let mut row = DocumentNode::row().with_child(DocumentNode::cell(&entry.account_nm));
            let mut push = |v: &Option<String>| {
                row.children
                    .push(DocumentNode::cell(v.as_deref().unwrap_or("-")));
            };
            push(&entry.thstrm_amount);
            if period.is_interim() {
                push(&entry.thstrm_add_amount);
            }
            push(&entry.frmtrm_amount);
            push(&entry.bfefrmtrm_amount);
            region = region.with_child(row);
        }
        Ok(DocumentNode::root().with_child(region))
    }

    async fn fetch_summary(&self, code: &str) -> Result<DocumentNode, FetchError> {
        let url = self
            .market_base
            .join(&format!("/api/v1/snapshot/{}", code))
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let body: SnapshotResponse = self.get_json(url).await?;

        let mut region = DocumentNode::region(DocumentKind::Summary.region_id());
        for item in body.items {
            let mut row = DocumentNode::row().with_child(DocumentNode::cell(&item.label));
            for value in &item.values {
                row = row.with_child(DocumentNode::cell(value));
            }
            region = region.with_child(row);
        }
        Ok(DocumentNode::root().with_child(region))
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for DartClient {
    async fn fetch(
        &self,
        code: &str,
        year: i32,
        kind: DocumentKind,
    ) -> Result<DocumentNode, FetchError> {
        let key = Self::cache_key(code, year, kind);
        if let Some(doc) = self.cache.get(&key).await {
            debug!("cache hit for {}", key);
            return Ok(doc);
        }

        let doc = match kind {
            DocumentKind::Summary => self.fetch_summary(code).await?,
            DocumentKind::Report { .. } => self.fetch_report(code, year, kind).await?,
        };

        self.cache.put(&key, &doc, CACHE_TTL).await;
        Ok(doc)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for DartClient {
    async fn market_metrics(&self, code: &str) -> Result<Option<MarketMetrics>, FetchError> {
        let url = self
            .market_base
            .join(&format!("/api/v1/listing/{}", code))
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let listing: ListingResponse = match self.get_json(url).await {
            Ok(listing) => listing,
            Err(FetchError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(MarketMetrics {
            code: listing.code,
            name: listing.name,
            price: listing.close,
            market_cap: listing.marcap,
            shares_outstanding: listing.stocks,
            dividend_yield: 0.0,
        }))
    }
}
