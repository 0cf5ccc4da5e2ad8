//! Discover command.

use std::sync::Arc;

use console::style;

use crate::cli::helpers::{build_discovery, build_fetcher, print_header, with_reconnect};
use crate::config::Settings;
use crate::crawl::CrawlCoordinator;
use crate::extract::{Extractor, ProductPageExtractor};

/// Fetch the sitemap and upsert every product link, without crawling.
pub async fn cmd_discover(settings: &Settings) -> anyhow::Result<()> {
    let fetcher = build_fetcher(settings)?;
    let extractor: Arc<dyn Extractor> = Arc::new(ProductPageExtractor::new());

    print_header(&format!("Discovering links from {}", settings.sitemap_url));
    let written = with_reconnect(settings, |ctx| {
        let coordinator = CrawlCoordinator::new(
            ctx,
            fetcher.clone(),
            extractor.clone(),
            build_discovery(settings, fetcher.clone()),
        );
        async move { coordinator.discover().await }
    })
    .await?;

    println!("{} Stored {} links", style("✓").green(), written);
    Ok(())
}
