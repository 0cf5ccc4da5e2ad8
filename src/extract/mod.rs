//! Markup extraction for product pages.
//!
//! The crawl phase reduces a full page to its detail fragment; the import
//! phase reads fields and categories back out of that fragment. Both are
//! pure functions over markup, behind the [`Extractor`] trait so another
//! page layout can be swapped in.

mod numbers;
mod product_page;

pub use numbers::{parse_price, parse_tenths};
pub use product_page::ProductPageExtractor;

use thiserror::Error;

use crate::models::ProductFields;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Missing element `{0}`")]
    MissingElement(&'static str),

    #[error("Invalid {field} value {text:?}")]
    InvalidNumber { field: &'static str, text: String },

    #[error("Product {id}: {source}")]
    Product {
        id: i64,
        source: Box<ExtractionError>,
    },
}

impl ExtractionError {
    /// Attach the record id to an extraction failure.
    pub fn for_product(self, id: i64) -> Self {
        match self {
            Self::Product { .. } => self,
            other => Self::Product {
                id,
                source: Box::new(other),
            },
        }
    }
}

/// Page-layout specific extraction rules.
pub trait Extractor: Send + Sync {
    /// Reduce a full page to its cleaned detail fragment.
    fn extract_fragment(&self, markup: &str) -> Result<String, ExtractionError>;

    /// Read product fields and category names out of a stored fragment.
    fn extract_fields(
        &self,
        markup: &str,
        id: i64,
    ) -> Result<(ProductFields, Vec<String>), ExtractionError>;
}
