use std::sync::Arc;

use anyhow::Result;
use chrono::Datelike;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use value_screener::api::DartClient;
use value_screener::batch::{reconcile_batch, BatchConfig};
use value_screener::models::{Config, ReportScope};
use value_screener::reconciler::Reconciler;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Consolidated,
    Standalone,
}

impl From<ScopeArg> for ReportScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Consolidated => ReportScope::Consolidated,
            ScopeArg::Standalone => ReportScope::Standalone,
        }
    }
}

/// Reconcile corporate filings into screened financial snapshots.
#[derive(Debug, Parser)]
#[command(name = "value-screener")]
struct Cli {
    /// Stock codes to reconcile (6-digit listing codes)
    #[arg(required = true)]
    codes: Vec<String>,

    /// Target fiscal year (defaults to last calendar year)
    #[arg(long)]
    year: Option<i32>,

    /// Restrict reconciliation to one report scope
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Maximum concurrent reconciliations (defaults to FETCH_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Emit the full batch result as JSON instead of the ranked table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("value_screener=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let year = cli
        .year
        .unwrap_or_else(|| chrono::Utc::now().year() - 1);

    info!("Screening {} entities for FY{}", cli.codes.len(), year);

    let client = Arc::new(DartClient::new(&config)?);
    let reconciler = Arc::new(Reconciler::new(client.clone(), client));

    let batch_config = BatchConfig {
        fiscal_year: year,
        scope: cli.scope.map(Into::into),
        concurrency: cli.concurrency.unwrap_or(config.fetch_concurrency),
    };
    let mut result = reconcile_batch(reconciler, cli.codes, batch_config).await;

    // Rank by composite score, best first.
    result
        .snapshots
        .sort_by(|a, b| b.ratios.composite_score.total_cmp(&a.ratios.composite_score));

    if cli.json {
        print_json(&result)?;
    } else {
        print_table(&result);
    }

    Ok(())
}

fn print_table(result: &value_screener::batch::BatchResult) {
    println!(
        "{:<8} {:<16} {:>8} {:>8} {:>10} {:>10} {:>8}",
        "Code", "Name", "PBR", "ROE%", "Retained%", "Cash%", "Score"
    );
    for snap in &result.snapshots {
        println!(
            "{:<8} {:<16} {:>8.2} {:>8.1} {:>10.1} {:>10.1} {:>8.1}",
            snap.code,
            snap.name,
            snap.ratios.pbr,
            snap.ratios.roe,
            snap.ratios.retained_rate,
            snap.ratios.cash_ratio,
            snap.ratios.composite_score,
        );
        if !snap.diagnostic.complete {
            println!("         (partial: {})", snap.diagnostic.summary());
        }
    }
    if !result.failures.is_empty() {
        println!("\nFailed entities:");
        for (code, reason) in &result.failures {
            println!("  {}: {}", code, reason);
        }
    }
}

fn print_json(result: &value_screener::batch::BatchResult) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonOutput<'a> {
        snapshots: &'a [value_screener::models::EntitySnapshot],
        failures: Vec<JsonFailure>,
    }

    #[derive(serde::Serialize)]
    struct JsonFailure {
        code: String,
        reason: String,
    }

    let output = JsonOutput {
        snapshots: &result.snapshots,
        failures: result
            .failures
            .iter()
            .map(|(code, reason)| JsonFailure {
                code: code.clone(),
                reason: reason.to_string(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
