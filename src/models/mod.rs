//! Data models for the catalog pipeline.

mod link;
mod product;

pub use link::{parse_link_id, CrawlState, Link};
pub use product::{price_per_alcohol, Category, Product, ProductFields, RawRecord};
