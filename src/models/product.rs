//! Raw records and the normalized product/category model.

use serde::{Deserialize, Serialize};

/// Cleaned markup fragment stored for one crawled product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: i64,
    pub html: String,
}

/// Fields extracted from a product page.
///
/// `alcohol_by_volume` and `volume` are fixed-point integers scaled by 10.
/// `price` is in minor currency units (øre).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub price: i64,
    pub alcohol_by_volume: i32,
    pub volume: i32,
}

/// A product row ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub alcohol_by_volume: i32,
    pub volume: i32,
    pub price_per_alcohol: f64,
}

impl Product {
    /// Build a product from extracted fields, deriving the price per alcohol.
    pub fn from_fields(id: i64, fields: ProductFields) -> Self {
        let price_per_alcohol =
            price_per_alcohol(fields.price, fields.volume, fields.alcohol_by_volume);
        Self {
            id,
            name: fields.name,
            price: fields.price,
            alcohol_by_volume: fields.alcohol_by_volume,
            volume: fields.volume,
            price_per_alcohol,
        }
    }
}

/// Price divided by pure-alcohol volume.
///
/// Defined as 0 when there is no alcohol. The importer never stores a
/// product without volume.
pub fn price_per_alcohol(price: i64, volume: i32, alcohol_by_volume: i32) -> f64 {
    if alcohol_by_volume == 0 {
        return 0.0;
    }
    let pure_alcohol = (f64::from(volume) / 1000.0) * (f64::from(alcohol_by_volume) / 1000.0);
    price as f64 / pure_alcohol
}

/// A category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_per_alcohol_is_zero_without_alcohol() {
        assert_eq!(price_per_alcohol(29990, 7500, 0), 0.0);
    }

    #[test]
    fn price_per_alcohol_matches_formula() {
        let expected = 29990.0 / ((7500.0 / 1000.0) * (135.0 / 1000.0));
        let actual = price_per_alcohol(29990, 7500, 135);
        assert!((actual - expected).abs() < 1e-9);
    }

    #[test]
    fn from_fields_carries_values() {
        let product = Product::from_fields(
            9,
            ProductFields {
                name: "Test Wine".to_string(),
                price: 29990,
                alcohol_by_volume: 135,
                volume: 7500,
            },
        );
        assert_eq!(product.id, 9);
        assert_eq!(product.name, "Test Wine");
        assert!(product.price_per_alcohol > 0.0);
    }
}
