//! End-to-end pipeline tests against a scripted fetcher and a temporary
//! SQLite database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use alkis::crawl::{CrawlCoordinator, CrawlDelay};
use alkis::discovery::SitemapDiscovery;
use alkis::extract::{Extractor, ProductPageExtractor};
use alkis::fetch::{FetchError, Fetcher};
use alkis::import::BatchImporter;
use alkis::models::CrawlState;
use alkis::repository::DbContext;
use alkis::PipelineError;

const INDEX_URL: &str = "https://shop.example/sitemap.xml";
const PRODUCT_SITEMAP_URL: &str = "https://shop.example/sitemap/Product-no-NOK-1.xml";

/// Serves canned responses and counts calls per URL.
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

fn product_url(id: i64) -> String {
    format!("https://shop.example/vin/p/{id}")
}

fn index_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{PRODUCT_SITEMAP_URL}</loc></sitemap>
  <sitemap><loc>https://shop.example/sitemap/Content-no-NOK.xml</loc></sitemap>
</sitemapindex>"#
    )
}

fn product_sitemap_xml(ids: &[i64]) -> String {
    let entries: String = ids
        .iter()
        .map(|id| {
            format!(
                "<url><loc>{}</loc><image:image><image:loc>https://img.example/{id}.png</image:loc></image:image></url>\n",
                product_url(*id)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
{entries}</urlset>"#
    )
}

fn product_page(name: &str, price: &str, alcohol: &str, volume: &str, categories: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><body>
<nav><span>Meny</span></nav>
<div class="product__details">
  <script>var x = 1;</script>
  <div class="product__image-container"><img src="/img.png"></div>
  <h1 class="product__name">{name}</h1>
  <p class="product__category-name">{categories}</p>
  <span class="product__price">Kr {price}</span>
  <button>Kjøp</button>
  <ul><li><strong>Alkohol</strong><span>{alcohol}</span></li></ul>
  <span class="amount">{volume}</span>
  <div class="expandable">Mer info</div>
</div>
</body></html>"#
    )
}

fn catalog(ids: &[i64]) -> ScriptedFetcher {
    let mut fetcher = ScriptedFetcher::default()
        .with_page(INDEX_URL, index_xml())
        .with_page(PRODUCT_SITEMAP_URL, product_sitemap_xml(ids));
    for id in ids {
        fetcher = fetcher.with_page(
            &product_url(*id),
            product_page(&format!("Vin {id}"), "149,90", "12 %", "750 ml", "Rødvin - Italia"),
        );
    }
    fetcher
}

async fn setup() -> (TempDir, DbContext) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::from_path(&dir.path().join("alkis.db"));
    ctx.init_schema().await.unwrap();
    (dir, ctx)
}

fn coordinator(ctx: &DbContext, fetcher: Arc<ScriptedFetcher>) -> CrawlCoordinator {
    let extractor: Arc<dyn Extractor> = Arc::new(ProductPageExtractor::new());
    let discovery = SitemapDiscovery::new(fetcher.clone(), INDEX_URL, "Product-no-NOK");
    CrawlCoordinator::new(ctx.clone(), fetcher, extractor, discovery).with_delay(CrawlDelay::none())
}

#[tokio::test]
async fn crawl_resumes_without_refetching() {
    let (_dir, ctx) = setup().await;
    let ids = [101, 102, 103, 104, 105];
    let fetcher = Arc::new(catalog(&ids));

    // First run is interrupted after two links.
    let summary = coordinator(&ctx, fetcher.clone()).run(Some(2)).await.unwrap();
    assert_eq!(summary.discovered, Some(5));
    assert_eq!(summary.stored, 2);
    assert_eq!(ctx.links().count_uncrawled().await.unwrap(), 3);

    // Restart finishes the remaining links without discovering again.
    let summary = coordinator(&ctx, fetcher.clone()).run(None).await.unwrap();
    assert_eq!(summary.discovered, None);
    assert_eq!(summary.stored, 3);

    assert_eq!(fetcher.calls(INDEX_URL), 1);
    assert_eq!(fetcher.calls(PRODUCT_SITEMAP_URL), 1);
    for id in ids {
        assert_eq!(fetcher.calls(&product_url(id)), 1, "product {id}");
    }
    assert_eq!(fetcher.total_calls(), 2 + ids.len());
    assert_eq!(ctx.links().count_uncrawled().await.unwrap(), 0);
    assert_eq!(ctx.raw_products().count().await.unwrap(), 5);
}

#[tokio::test]
async fn crawl_then_import_end_to_end() {
    let (_dir, ctx) = setup().await;
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_page(INDEX_URL, index_xml())
            .with_page(PRODUCT_SITEMAP_URL, product_sitemap_xml(&[7001, 7002]))
            .with_page(
                &product_url(7001),
                product_page("Test Wine", "299,90", "13,5 %", "750 ml", "Rødvin - Frankrike"),
            )
            .with_page(
                &product_url(7002),
                product_page("Alkoholfri Vin", "99,90", "0 %", "750 ml", "Alkoholfritt - Frankrike"),
            ),
    );

    let summary = coordinator(&ctx, fetcher).run(None).await.unwrap();
    assert_eq!(summary.stored, 2);

    let stored = ctx.raw_products().get(7001).await.unwrap().unwrap();
    assert!(!stored.html.contains("<script"));
    assert!(!stored.html.contains("Meny"));

    let importer = BatchImporter::new(ctx.clone(), Arc::new(ProductPageExtractor::new()));
    let report = importer.run_import().await.unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped_zero_alcohol, 1);

    let products = ctx.products();
    let wine = products.get(7001).await.unwrap().unwrap();
    assert_eq!(wine.name, "Test Wine");
    assert_eq!(wine.price, 29990);
    assert_eq!(wine.alcohol_by_volume, 135);
    assert_eq!(wine.volume, 7500);
    let expected = 29990.0 / ((7500.0 / 1000.0) * (135.0 / 1000.0));
    assert!((wine.price_per_alcohol - expected).abs() < 1e-6);

    let categories: Vec<String> = products
        .categories_for(7001)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(categories, vec!["Frankrike", "Rødvin"]);

    assert!(products.get(7002).await.unwrap().is_none());
    assert_eq!(products.count_categories().await.unwrap(), 2);

    // A second import pass leaves the same rows.
    importer.run_import().await.unwrap();
    assert_eq!(products.count().await.unwrap(), 1);
    assert_eq!(products.count_pairs().await.unwrap(), 2);
}

#[tokio::test]
async fn failed_link_stays_pending_and_run_terminates() {
    let (_dir, ctx) = setup().await;
    let mut fetcher = catalog(&[1, 2, 3]);
    fetcher.pages.remove(&product_url(2));
    fetcher = fetcher.with_page(&product_url(3), "<html><body>Ikke funnet</body></html>");
    let fetcher = Arc::new(fetcher);

    let summary = coordinator(&ctx, fetcher.clone()).run(None).await.unwrap();
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.stored, 1);
    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(summary.extract_failed, 1);

    assert_eq!(fetcher.calls(&product_url(2)), 1);
    assert!(!ctx.links().get(2).await.unwrap().unwrap().crawled);
    assert!(!ctx.links().get(3).await.unwrap().unwrap().crawled);
    assert_eq!(ctx.links().count_uncrawled().await.unwrap(), 2);

    // The next run retries the failed links.
    coordinator(&ctx, fetcher.clone()).run(None).await.unwrap();
    assert_eq!(fetcher.calls(&product_url(2)), 2);
    assert_eq!(fetcher.calls(&product_url(1)), 1);
}

#[tokio::test]
async fn crawl_moves_past_failing_links_in_one_run() {
    let (_dir, ctx) = setup().await;
    let mut fetcher = catalog(&[1, 2, 3, 4, 5]);
    fetcher.pages.remove(&product_url(1));
    fetcher.pages.remove(&product_url(2));
    let fetcher = Arc::new(fetcher);

    let summary = coordinator(&ctx, fetcher.clone()).run(None).await.unwrap();
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.fetch_failed, 2);
    assert_eq!(summary.stored, 3);
    for id in 1..=5 {
        assert_eq!(fetcher.calls(&product_url(id)), 1, "product {id}");
    }

    let pending = ctx.links().next_uncrawled().await.unwrap().unwrap();
    assert_eq!(pending.id, 1);
    assert_eq!(ctx.links().count_uncrawled().await.unwrap(), 2);
}

#[tokio::test]
async fn recrawling_a_link_is_idempotent() {
    let (_dir, ctx) = setup().await;
    let fetcher = Arc::new(catalog(&[42]));
    let crawler = coordinator(&ctx, fetcher);
    crawler.discover().await.unwrap();

    let link = ctx.links().get(42).await.unwrap().unwrap();
    assert_eq!(crawler.crawl_link(&link).await.unwrap(), CrawlState::Stored);
    let first = ctx.raw_products().get(42).await.unwrap().unwrap();
    assert_eq!(crawler.crawl_link(&link).await.unwrap(), CrawlState::Stored);
    let second = ctx.raw_products().get(42).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.raw_products().count().await.unwrap(), 1);
    assert!(ctx.links().get(42).await.unwrap().unwrap().crawled);
}

#[tokio::test]
async fn rediscovery_is_idempotent() {
    let (_dir, ctx) = setup().await;
    let fetcher = Arc::new(catalog(&[5, 6, 7]));
    let crawler = coordinator(&ctx, fetcher);

    assert_eq!(crawler.discover().await.unwrap(), 3);
    assert_eq!(crawler.discover().await.unwrap(), 3);
    assert_eq!(ctx.links().count().await.unwrap(), 3);
    assert_eq!(ctx.links().get(6).await.unwrap().unwrap().image, "https://img.example/6.png");
}

#[tokio::test]
async fn missing_sitemap_index_is_an_error() {
    let (_dir, ctx) = setup().await;
    let fetcher = Arc::new(ScriptedFetcher::default());

    let err = coordinator(&ctx, fetcher).run(None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Discovery(_)));
    assert!(!err.is_connection_lost());
}

#[tokio::test]
async fn import_of_empty_store_finishes() {
    let (_dir, ctx) = setup().await;
    let importer = BatchImporter::new(ctx.clone(), Arc::new(ProductPageExtractor::new()));
    let summary = importer.run_import().await.unwrap();
    assert_eq!(summary.windows, 0);
    assert_eq!(ctx.stats().await.unwrap().products, 0);
}
