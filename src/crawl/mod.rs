//! Resumable, rate-limited crawl of the link catalog.
//!
//! Progress lives entirely in the database: a link is only marked crawled in
//! the same transaction that stores its fragment, so a restarted run picks
//! up exactly the links that are still pending.

mod delay;

pub use delay::CrawlDelay;

use std::sync::Arc;

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::discovery::SitemapDiscovery;
use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::models::{CrawlState, Link};
use crate::repository::DbContext;

/// Outcome counts for one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Links stored by discovery, when the run had to discover first.
    pub discovered: Option<usize>,
    pub attempted: usize,
    pub stored: usize,
    pub fetch_failed: usize,
    pub extract_failed: usize,
}

impl CrawlSummary {
    fn record(&mut self, state: CrawlState) {
        self.attempted += 1;
        match state {
            CrawlState::Stored => self.stored += 1,
            CrawlState::FetchFailed => self.fetch_failed += 1,
            CrawlState::ExtractFailed => self.extract_failed += 1,
            CrawlState::Pending | CrawlState::Fetching => {}
        }
    }

    pub fn failed(&self) -> usize {
        self.fetch_failed + self.extract_failed
    }
}

/// Drives discovery and the fetch/extract/store loop.
pub struct CrawlCoordinator {
    ctx: DbContext,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    discovery: SitemapDiscovery,
    delay: CrawlDelay,
    progress: Option<ProgressBar>,
}

impl CrawlCoordinator {
    pub fn new(
        ctx: DbContext,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        discovery: SitemapDiscovery,
    ) -> Self {
        Self {
            ctx,
            fetcher,
            extractor,
            discovery,
            delay: CrawlDelay::default(),
            progress: None,
        }
    }

    pub fn with_delay(mut self, delay: CrawlDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Report each crawled link on a progress bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Discover links and upsert them into the catalog.
    ///
    /// Returns the number of distinct links written.
    pub async fn discover(&self) -> Result<usize, PipelineError> {
        let links = self.discovery.discover_links().await?;
        let written = self.ctx.links().upsert_links(&links).await?;
        info!("Stored {} links", written);
        Ok(written)
    }

    /// Crawl until no pending links remain, or until `limit` links were
    /// attempted.
    ///
    /// Discovery runs first when nothing is pending. Links that fail in this
    /// run are not retried until the next run.
    pub async fn run(&self, limit: Option<usize>) -> Result<CrawlSummary, PipelineError> {
        let links = self.ctx.links();
        let mut summary = CrawlSummary::default();

        if links.count_uncrawled().await? == 0 {
            info!("No links to crawl, fetching new links");
            summary.discovered = Some(self.discover().await?);
        }

        if let Some(pb) = &self.progress {
            pb.set_length(links.count_uncrawled().await?);
        }

        // Pending links are walked in id order; the cursor keeps links that
        // failed in this run from being picked again.
        let mut cursor: Option<i64> = None;
        loop {
            if limit.is_some_and(|max| summary.attempted >= max) {
                info!("Reached crawl limit of {}", summary.attempted);
                break;
            }

            let Some(link) = links.next_uncrawled_after(cursor).await? else {
                break;
            };

            if summary.attempted > 0 {
                self.delay.wait().await;
            }

            let state = self.crawl_link(&link).await?;
            summary.record(state);
            cursor = Some(link.id);

            if let Some(pb) = &self.progress {
                pb.inc(1);
                pb.set_message(format!("{} {}", link.id, state));
            }
        }

        if summary.failed() == 0 {
            info!("Crawled all links");
        } else {
            warn!(
                "{} links failed this run and stay pending for the next one",
                summary.failed()
            );
        }
        Ok(summary)
    }

    /// Fetch, clean and store one link.
    ///
    /// Fetch and extraction failures leave the link pending and are returned
    /// as states; only database errors are returned as `Err`.
    pub async fn crawl_link(&self, link: &Link) -> Result<CrawlState, PipelineError> {
        info!("Crawling link {}", link.loc);
        debug!("{} -> {}", link.id, CrawlState::Fetching);

        let page = match self.fetcher.fetch(&link.loc).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch product {} ({}): {}", link.id, link.loc, e);
                return Ok(CrawlState::FetchFailed);
            }
        };

        let fragment = match self.extractor.extract_fragment(&page) {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!("Failed to extract product {} ({}): {}", link.id, link.loc, e);
                return Ok(CrawlState::ExtractFailed);
            }
        };

        self.ctx
            .raw_products()
            .store_and_mark_crawled(link.id, &fragment)
            .await?;
        Ok(CrawlState::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_states() {
        let mut summary = CrawlSummary::default();
        summary.record(CrawlState::Stored);
        summary.record(CrawlState::FetchFailed);
        summary.record(CrawlState::ExtractFailed);
        summary.record(CrawlState::Stored);

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.stored, 2);
        assert_eq!(summary.failed(), 2);
    }
}
