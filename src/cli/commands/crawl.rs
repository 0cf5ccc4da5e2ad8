//! Crawl command.

use std::sync::Arc;

use console::style;

use crate::cli::helpers::{
    build_discovery, build_fetcher, print_header, print_row, progress_bar, with_reconnect,
};
use crate::config::Settings;
use crate::crawl::{CrawlCoordinator, CrawlSummary};
use crate::extract::{Extractor, ProductPageExtractor};

/// Crawl pending links into the raw store.
pub async fn cmd_crawl(settings: &Settings, limit: Option<usize>) -> anyhow::Result<()> {
    let fetcher = build_fetcher(settings)?;
    let extractor: Arc<dyn Extractor> = Arc::new(ProductPageExtractor::new());

    print_header("Crawling product links");
    let pb = progress_bar("crawl");
    let result = with_reconnect(settings, |ctx| {
        let coordinator = CrawlCoordinator::new(
            ctx,
            fetcher.clone(),
            extractor.clone(),
            build_discovery(settings, fetcher.clone()),
        )
        .with_delay(settings.crawl_delay())
        .with_progress(pb.clone());
        async move { coordinator.run(limit).await }
    })
    .await;
    pb.finish_and_clear();

    print_summary(&result?);
    Ok(())
}

fn print_summary(summary: &CrawlSummary) {
    println!("\n{} Crawl complete:", style("✓").green());
    if let Some(discovered) = summary.discovered {
        print_row("Links discovered", style(discovered).dim());
    }
    print_row("Links attempted", style(summary.attempted).dim());
    print_row("Pages stored", style(summary.stored).green());
    if summary.fetch_failed > 0 {
        print_row("Fetch failures", style(summary.fetch_failed).yellow());
    }
    if summary.extract_failed > 0 {
        print_row("Extract failures", style(summary.extract_failed).yellow());
    }
}
