//! Sitemap-driven product link discovery.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use super::DiscoveryError;
use crate::fetch::Fetcher;
use crate::models::Link;

static LOC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<url>(.*?)</url>").unwrap());
static IMAGE_LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<image:loc>\s*(.*?)\s*</image:loc>").unwrap());

/// Discovers product links from a sitemap index and its product sub-sitemaps.
pub struct SitemapDiscovery {
    fetcher: Arc<dyn Fetcher>,
    sitemap_url: String,
    product_marker: String,
}

impl SitemapDiscovery {
    pub fn new(fetcher: Arc<dyn Fetcher>, sitemap_url: &str, product_marker: &str) -> Self {
        Self {
            fetcher,
            sitemap_url: sitemap_url.to_string(),
            product_marker: product_marker.to_string(),
        }
    }

    /// Fetch the index, then every product sub-sitemap, and collect links.
    ///
    /// Only a failure to fetch the index is an error; failed sub-sitemaps
    /// and entries without a numeric id are skipped with a warning.
    pub async fn discover_links(&self) -> Result<Vec<Link>, DiscoveryError> {
        info!("Fetching sitemap index {}", self.sitemap_url);
        let index = self
            .fetcher
            .fetch(&self.sitemap_url)
            .await
            .map_err(|source| DiscoveryError::Index {
                url: self.sitemap_url.clone(),
                source,
            })?;

        let sitemaps: Vec<String> = extract_locs(&index)
            .into_iter()
            .filter(|loc| loc.contains(&self.product_marker))
            .collect();
        info!("Found {} product sitemaps", sitemaps.len());

        let mut links = Vec::new();
        for sitemap_url in &sitemaps {
            debug!("Fetching sitemap: {}", sitemap_url);
            let xml = match self.fetcher.fetch(sitemap_url).await {
                Ok(xml) => xml,
                Err(e) => {
                    warn!("Skipping sitemap {}: {}", sitemap_url, e);
                    continue;
                }
            };
            let found = extract_links(&xml);
            debug!("{} links in {}", found.len(), sitemap_url);
            links.extend(found);
        }

        info!("Discovered {} product links", links.len());
        Ok(links)
    }
}

/// Extract every `<loc>` value from sitemap XML.
pub fn extract_locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .map(|c| unescape_xml(&c[1]))
        .collect()
}

/// Extract links from the `<url>` entries of a sitemap.
pub fn extract_links(xml: &str) -> Vec<Link> {
    let mut links = Vec::new();
    for entry in URL_RE.captures_iter(xml) {
        let body = &entry[1];
        let Some(loc) = LOC_RE.captures(body).map(|c| unescape_xml(&c[1])) else {
            continue;
        };
        let image = IMAGE_LOC_RE
            .captures(body)
            .map(|c| unescape_xml(&c[1]))
            .unwrap_or_default();

        match Link::from_sitemap(loc, image) {
            Some(link) => links.push(link),
            None => warn!("Skipping sitemap entry without numeric id: {}", body.trim()),
        }
    }
    links
}

/// Unescape the predefined XML entities.
fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
