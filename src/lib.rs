//! alkis - product catalog ingestion.
//!
//! Discovers product pages from a sitemap, crawls them into a raw store with
//! a randomized delay, and imports the stored markup into normalized product
//! and category tables in batched transactions.

pub mod cli;
pub mod config;
pub mod crawl;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod import;
pub mod models;
pub mod repository;
pub mod schema;

pub use error::PipelineError;
