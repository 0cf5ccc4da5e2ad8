//! Database context: pool ownership, schema bootstrap and repository access.

use std::path::Path;
use std::time::Duration;

use diesel::prelude::*;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::links::LinkRepository;
use super::pool::{DbPool, DieselError};
use super::products::ProductRepository;
use super::raw::RawProductRepository;
use super::util::{is_connection_error, redact_url_password};
use crate::schema::{categories, links, products, raw_products};
use crate::{with_conn, with_conn_split};

const SQLITE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY,
    loc TEXT NOT NULL,
    image TEXT NOT NULL,
    crawled BOOLEAN NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_links_crawled ON links(crawled);

CREATE TABLE IF NOT EXISTS raw_products (
    id INTEGER PRIMARY KEY,
    html TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    price INTEGER NOT NULL,
    alcohol_by_volume INTEGER NOT NULL,
    volume INTEGER NOT NULL,
    price_per_alcohol REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS product_categories (
    product_id INTEGER NOT NULL REFERENCES products(id),
    category_id INTEGER NOT NULL REFERENCES categories(id),
    PRIMARY KEY (product_id, category_id)
);
"#;

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS links (
    id BIGINT PRIMARY KEY,
    loc TEXT NOT NULL,
    image TEXT NOT NULL,
    crawled BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS idx_links_crawled ON links(crawled);

CREATE TABLE IF NOT EXISTS raw_products (
    id BIGINT PRIMARY KEY,
    html TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    price BIGINT NOT NULL,
    alcohol_by_volume INTEGER NOT NULL,
    volume INTEGER NOT NULL,
    price_per_alcohol DOUBLE PRECISION NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS product_categories (
    product_id BIGINT NOT NULL REFERENCES products(id),
    category_id BIGINT NOT NULL REFERENCES categories(id),
    PRIMARY KEY (product_id, category_id)
);
"#;

/// Row counts across the catalog tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub links: u64,
    pub uncrawled: u64,
    pub raw_products: u64,
    pub products: u64,
    pub categories: u64,
}

/// Database context that owns the pool and hands out repositories.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("sqlite:alkis.db")?;
/// ctx.init_schema().await?;
/// let pending = ctx.links().count_uncrawled().await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database URL (`sqlite:` path or `postgres://`).
    pub fn from_url(database_url: &str) -> Result<Self, DieselError> {
        Ok(Self {
            pool: DbPool::from_url(database_url)?,
        })
    }

    /// Create a SQLite context from a file path.
    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: DbPool::sqlite_from_path(db_path),
        }
    }

    /// Connect, verify and bootstrap the schema.
    ///
    /// Failures to reach the database are retried without limit, with a fixed
    /// `backoff` between attempts. Anything else, such as a URL for a backend
    /// this build lacks or a schema error, is returned at once.
    pub async fn connect_with_retry(
        database_url: &str,
        backoff: Duration,
    ) -> Result<Self, DieselError> {
        let ctx = Self::from_url(database_url)?;
        let display_url = redact_url_password(database_url);
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match ctx.bootstrap().await {
                Ok(()) => {
                    info!("Connected to database {}", display_url);
                    return Ok(ctx);
                }
                Err(e) if is_connection_error(&e) => {
                    warn!(
                        "Connection attempt {} to {} failed: {}. Retrying in {:?}",
                        attempt, display_url, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn bootstrap(&self) -> Result<(), DieselError> {
        self.test_connection().await?;
        self.init_schema().await
    }

    /// Link catalog repository.
    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.pool.clone())
    }

    /// Raw markup store.
    pub fn raw_products(&self) -> RawProductRepository {
        RawProductRepository::new(self.pool.clone())
    }

    /// Normalized product/category repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Run a trivial query to check the database is reachable.
    pub async fn test_connection(&self) -> Result<(), DieselError> {
        with_conn!(self.pool, conn, {
            conn.batch_execute("SELECT 1").await?;
            Ok(())
        })
    }

    /// Create the catalog tables if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                conn.batch_execute(SQLITE_SCHEMA).await
            },
            postgres: conn => {
                conn.batch_execute(POSTGRES_SCHEMA).await
            }
        )
    }

    /// Count rows in each catalog table.
    pub async fn stats(&self) -> Result<CatalogStats, DieselError> {
        with_conn!(self.pool, conn, {
            let link_count: i64 = links::table.count().get_result(&mut conn).await?;
            let uncrawled: i64 = links::table
                .filter(links::crawled.eq(false))
                .count()
                .get_result(&mut conn)
                .await?;
            let raw_count: i64 = raw_products::table.count().get_result(&mut conn).await?;
            let product_count: i64 = products::table.count().get_result(&mut conn).await?;
            let category_count: i64 = categories::table.count().get_result(&mut conn).await?;

            Ok(CatalogStats {
                links: link_count as u64,
                uncrawled: uncrawled as u64,
                raw_products: raw_count as u64,
                products: product_count as u64,
                categories: category_count as u64,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema_is_repeatable() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));

        ctx.init_schema().await.unwrap();
        ctx.init_schema().await.unwrap();

        let stats = ctx.stats().await.unwrap();
        assert_eq!(stats, CatalogStats::default());
    }

    #[tokio::test]
    async fn test_connect_with_retry_bootstraps_schema() {
        let dir = tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("retry.db").display());

        let ctx = DbContext::connect_with_retry(&url, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(ctx.stats().await.unwrap().links, 0);
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_unsupported_backend_fails_without_retrying() {
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            DbContext::connect_with_retry("postgres://u:p@localhost/db", Duration::from_millis(10)),
        )
        .await
        .expect("connect_with_retry kept retrying a configuration error");
        assert!(result.is_err());
    }
}
