//! Settings for the ingestion pipeline.
//!
//! Values come from built-in defaults, optionally overlaid by a TOML or JSON
//! file (`--config`), then by command-line flags and their environment
//! variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crawl::CrawlDelay;
use crate::error::PipelineError;
use crate::repository::util::is_postgres_url;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:alkis.db";
pub const DEFAULT_SITEMAP_URL: &str = "https://www.vinmonopolet.no/sitemap.xml";
pub const DEFAULT_PRODUCT_SITEMAP_MARKER: &str = "Product-no-NOK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `sqlite:<path>` or `postgres://...`.
    pub database_url: String,
    /// Sitemap index to discover product sitemaps from.
    pub sitemap_url: String,
    /// Substring identifying product sub-sitemaps in the index.
    pub product_sitemap_marker: String,
    pub request_timeout_secs: u64,
    /// Base delay between crawl requests.
    pub crawl_delay_ms: u64,
    /// Upper bound of the random delay added to `crawl_delay_ms`.
    pub crawl_jitter_ms: u64,
    /// Raw records per import transaction.
    pub import_window: u64,
    /// Wait between database connection attempts.
    pub connect_backoff_ms: u64,
    /// Overrides the default browser user agent.
    pub user_agent: Option<String>,
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            sitemap_url: DEFAULT_SITEMAP_URL.to_string(),
            product_sitemap_marker: DEFAULT_PRODUCT_SITEMAP_MARKER.to_string(),
            request_timeout_secs: 30,
            crawl_delay_ms: 8000,
            crawl_jitter_ms: 3000,
            import_window: 1000,
            connect_backoff_ms: 500,
            user_agent: None,
            source_path: None,
        }
    }
}

impl Settings {
    /// Load settings from a file, filling missing keys with defaults.
    /// The format follows the extension: `.json` is JSON, anything else TOML.
    pub async fn load_from_path(path: &Path) -> Result<Self, PipelineError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut settings: Settings = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| PipelineError::Config(format!("Failed to parse JSON config: {}", e)))?,
            _ => toml::from_str(&contents)
                .map_err(|e| PipelineError::Config(format!("Failed to parse TOML config: {}", e)))?,
        };
        settings.source_path = Some(path.to_path_buf());
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => Self::load_from_path(path).await,
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.database_url.trim().is_empty() {
            return Err(PipelineError::Config("database_url is empty".into()));
        }
        #[cfg(not(feature = "postgres"))]
        if self.is_postgres() {
            return Err(PipelineError::Config(
                "database_url is PostgreSQL but this build lacks the `postgres` feature".into(),
            ));
        }
        if self.import_window == 0 {
            return Err(PipelineError::Config("import_window must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn is_postgres(&self) -> bool {
        is_postgres_url(&self.database_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }

    pub fn crawl_delay(&self) -> CrawlDelay {
        CrawlDelay::from_millis(self.crawl_delay_ms, self.crawl_jitter_ms)
    }
}
