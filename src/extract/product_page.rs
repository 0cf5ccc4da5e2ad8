//! Extraction rules for the product detail page layout.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::numbers::{parse_price, parse_tenths};
use super::{ExtractionError, Extractor};
use crate::models::ProductFields;

const DETAILS: &str = "div.product__details";
const NAME: &str = "h1.product__name";
const PRICE: &str = "span.product__price";
const AMOUNT: &str = "span.amount";
const CATEGORY: &str = "p.product__category-name";
const ALCOHOL_LABEL: &str = "Alkohol";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static DETAILS_SEL: LazyLock<Selector> = LazyLock::new(|| selector(DETAILS));
static NAME_SEL: LazyLock<Selector> = LazyLock::new(|| selector(NAME));
static PRICE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(PRICE));
static AMOUNT_SEL: LazyLock<Selector> = LazyLock::new(|| selector(AMOUNT));
static CATEGORY_SEL: LazyLock<Selector> = LazyLock::new(|| selector(CATEGORY));
static LABEL_OR_VALUE_SEL: LazyLock<Selector> = LazyLock::new(|| selector("strong, span"));
// Non-content parts of the detail block.
static STRIP_SEL: LazyLock<Selector> = LazyLock::new(|| {
    selector("script, div.expandable, .no-print, button, div.product__image-container")
});

/// Extractor for product pages that carry a `div.product__details` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductPageExtractor;

impl ProductPageExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn first_text(html: &Html, sel: &Selector, css: &'static str) -> Result<String, ExtractionError> {
    html.select(sel)
        .next()
        .map(text)
        .ok_or(ExtractionError::MissingElement(css))
}

/// Text of the first `span` following the `strong` labelled "Alkohol", in
/// document order.
fn alcohol_text(html: &Html) -> Result<String, ExtractionError> {
    let mut after_label = false;
    for element in html.select(&LABEL_OR_VALUE_SEL) {
        match element.value().name() {
            "span" if after_label => return Ok(text(element)),
            "strong" if !after_label && text(element).trim() == ALCOHOL_LABEL => {
                after_label = true;
            }
            _ => {}
        }
    }
    Err(ExtractionError::MissingElement("strong \"Alkohol\" + span"))
}

fn split_categories(text: &str) -> Vec<String> {
    text.split(" - ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl Extractor for ProductPageExtractor {
    fn extract_fragment(&self, markup: &str) -> Result<String, ExtractionError> {
        let mut html = Html::parse_document(markup);

        let (details_id, doomed) = {
            let details = html
                .select(&DETAILS_SEL)
                .next()
                .ok_or(ExtractionError::MissingElement(DETAILS))?;
            let doomed: Vec<_> = details.select(&STRIP_SEL).map(|e| e.id()).collect();
            (details.id(), doomed)
        };

        for id in doomed {
            if let Some(mut node) = html.tree.get_mut(id) {
                node.detach();
            }
        }

        html.tree
            .get(details_id)
            .and_then(ElementRef::wrap)
            .map(|details| details.html())
            .ok_or(ExtractionError::MissingElement(DETAILS))
    }

    fn extract_fields(
        &self,
        markup: &str,
        id: i64,
    ) -> Result<(ProductFields, Vec<String>), ExtractionError> {
        let html = Html::parse_document(markup);
        let read = || -> Result<(ProductFields, Vec<String>), ExtractionError> {
            let name = first_text(&html, &NAME_SEL, NAME)?.trim().to_string();
            let price = parse_price(&first_text(&html, &PRICE_SEL, PRICE)?)?;
            let alcohol_by_volume = parse_tenths("alcohol", &alcohol_text(&html)?)?;
            let volume = parse_tenths("volume", &first_text(&html, &AMOUNT_SEL, AMOUNT)?)?;
            let categories = split_categories(&first_text(&html, &CATEGORY_SEL, CATEGORY)?);

            Ok((
                ProductFields {
                    name,
                    price,
                    alcohol_by_volume,
                    volume,
                },
                categories,
            ))
        };
        read().map_err(|e| e.for_product(id))
    }
}
