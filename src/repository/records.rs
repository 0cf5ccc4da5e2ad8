//! Diesel models for database tables.

use diesel::prelude::*;

use super::batch::{BatchRow, BindValue, Column};
use crate::models::{Category, Link, Product, RawRecord};
use crate::schema;

/// Link record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::links)]
pub struct LinkRecord {
    pub id: i64,
    pub loc: String,
    pub image: String,
    pub crawled: bool,
}

impl From<LinkRecord> for Link {
    fn from(record: LinkRecord) -> Self {
        Link {
            id: record.id,
            loc: record.loc,
            image: record.image,
            crawled: record.crawled,
        }
    }
}

/// Raw product markup record.
#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::raw_products)]
pub struct RawProductRecord {
    pub id: i64,
    pub html: String,
}

impl From<RawProductRecord> for RawRecord {
    fn from(record: RawProductRecord) -> Self {
        RawRecord {
            id: record.id,
            html: record.html,
        }
    }
}

/// Product record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::products)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub alcohol_by_volume: i32,
    pub volume: i32,
    pub price_per_alcohol: f64,
}

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        Product {
            id: record.id,
            name: record.name,
            price: record.price,
            alcohol_by_volume: record.alcohol_by_volume,
            volume: record.volume,
            price_per_alcohol: record.price_per_alcohol,
        }
    }
}

/// Category record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::categories)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        Category {
            id: record.id,
            name: record.name,
        }
    }
}

impl BatchRow for Link {
    const TABLE: &'static str = "links";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::param("id"),
            Column::param("loc"),
            Column::param("image"),
            Column::param("crawled"),
        ];
        COLUMNS
    }

    fn push_binds(&self, binds: &mut Vec<BindValue>) {
        binds.push(BindValue::BigInt(self.id));
        binds.push(BindValue::Text(self.loc.clone()));
        binds.push(BindValue::Text(self.image.clone()));
        binds.push(BindValue::Bool(self.crawled));
    }
}

impl BatchRow for Product {
    const TABLE: &'static str = "products";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::param("id"),
            Column::param("name"),
            Column::param("price"),
            Column::param("alcohol_by_volume"),
            Column::param("volume"),
            Column::param("price_per_alcohol"),
        ];
        COLUMNS
    }

    fn push_binds(&self, binds: &mut Vec<BindValue>) {
        binds.push(BindValue::BigInt(self.id));
        binds.push(BindValue::Text(self.name.clone()));
        binds.push(BindValue::BigInt(self.price));
        binds.push(BindValue::Integer(self.alcohol_by_volume));
        binds.push(BindValue::Integer(self.volume));
        binds.push(BindValue::Double(self.price_per_alcohol));
    }
}

/// New category name for insert-or-ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

impl BatchRow for NewCategory {
    const TABLE: &'static str = "categories";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[Column::param("name")];
        COLUMNS
    }

    fn push_binds(&self, binds: &mut Vec<BindValue>) {
        binds.push(BindValue::Text(self.name.clone()));
    }
}

/// Product/category pair; the category id is resolved by name at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductCategoryPair {
    pub product_id: i64,
    pub category: String,
}

impl BatchRow for ProductCategoryPair {
    const TABLE: &'static str = "product_categories";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::param("product_id"),
            Column::expr("category_id", "(SELECT id FROM categories WHERE name = {})"),
        ];
        COLUMNS
    }

    fn push_binds(&self, binds: &mut Vec<BindValue>) {
        binds.push(BindValue::BigInt(self.product_id));
        binds.push(BindValue::Text(self.category.clone()));
    }
}
