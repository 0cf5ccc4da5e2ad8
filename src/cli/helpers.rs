//! Shared helpers for CLI commands.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::config::Settings;
use crate::discovery::SitemapDiscovery;
use crate::error::PipelineError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::repository::DbContext;

/// Connect, run one phase, and rerun it on a fresh connection whenever the
/// database connection is lost.
///
/// Every phase writes idempotently, so rerunning picks up where the lost
/// attempt stopped.
pub async fn with_reconnect<T, F, Fut>(settings: &Settings, mut phase: F) -> anyhow::Result<T>
where
    F: FnMut(DbContext) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let backoff = settings.connect_backoff();
    loop {
        let ctx = DbContext::connect_with_retry(&settings.database_url, backoff)
            .await
            .map_err(PipelineError::from)?;
        match phase(ctx).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_connection_lost() => {
                warn!("Connection to database lost: {}. Retrying...", e);
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn build_fetcher(settings: &Settings) -> Result<Arc<dyn Fetcher>, PipelineError> {
    let fetcher = HttpFetcher::new(settings.request_timeout(), settings.user_agent.as_deref())?;
    Ok(Arc::new(fetcher))
}

pub fn build_discovery(settings: &Settings, fetcher: Arc<dyn Fetcher>) -> SitemapDiscovery {
    SitemapDiscovery::new(
        fetcher,
        &settings.sitemap_url,
        &settings.product_sitemap_marker,
    )
}

pub fn progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("█▓░"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_header(text: &str) {
    println!("\n{} {}", style("→").cyan(), text);
}

pub fn print_row(label: &str, value: impl std::fmt::Display) {
    println!("  {:<22} {}", format!("{}:", label), value);
}
