//! Link discovery.

mod sitemap;

pub use sitemap::{extract_links, extract_locs, SitemapDiscovery};

use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to fetch sitemap index {url}: {source}")]
    Index {
        url: String,
        #[source]
        source: FetchError,
    },
}
