//! Crawlable product links discovered from the sitemap.

use serde::{Deserialize, Serialize};
use url::Url;

/// A discovered product page reference with its crawl flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Stable product id parsed from the last path segment of `loc`.
    pub id: i64,
    pub loc: String,
    pub image: String,
    pub crawled: bool,
}

impl Link {
    /// Create a pending link, deriving the id from the location.
    ///
    /// Returns `None` when the last path segment is not an integer.
    pub fn from_sitemap(loc: String, image: String) -> Option<Self> {
        let id = parse_link_id(&loc)?;
        Some(Self {
            id,
            loc,
            image,
            crawled: false,
        })
    }
}

/// Parse the numeric product id from the last non-empty path segment of a URL.
pub fn parse_link_id(loc: &str) -> Option<i64> {
    let segment = match Url::parse(loc) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .map(ToString::to_string),
        Err(_) => loc
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(ToString::to_string),
    }?;
    segment.parse().ok()
}

/// Per-link crawl state.
///
/// Only `Stored` is persisted (as `crawled = true`); every other state leaves
/// the link pending so the next run selects it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Pending,
    Fetching,
    Stored,
    FetchFailed,
    ExtractFailed,
}

impl CrawlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Stored => "stored",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractFailed => "extract_failed",
        }
    }
}

impl std::fmt::Display for CrawlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
