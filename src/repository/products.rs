//! Normalized product and category storage.

use std::collections::{HashMap, HashSet};

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::batch::{rows_per_statement, BatchInsert, OnConflict};
use super::pool::{DbPool, DieselError};
use super::records::{CategoryRecord, NewCategory, ProductCategoryPair, ProductRecord};
use crate::models::{Category, Product};
use crate::schema::{categories, product_categories, products};
use crate::with_conn;

const PRODUCT_CONFLICT: OnConflict = OnConflict::DoUpdate {
    target: &["id"],
    update: &[
        "name",
        "price",
        "alcohol_by_volume",
        "volume",
        "price_per_alcohol",
    ],
};

const CATEGORY_CONFLICT: OnConflict = OnConflict::DoNothing { target: &["name"] };

const PAIR_CONFLICT: OnConflict = OnConflict::DoNothing {
    target: &["product_id", "category_id"],
};

/// Rows for one import transaction, deduplicated by natural key.
///
/// Products are keyed by id (last wins), category names and product/category
/// pairs are kept once each in first-seen order.
#[derive(Debug, Default)]
pub struct ProductBatch {
    products: Vec<Product>,
    product_index: HashMap<i64, usize>,
    categories: Vec<NewCategory>,
    category_names: HashSet<String>,
    pairs: Vec<ProductCategoryPair>,
    seen_pairs: HashSet<(i64, String)>,
}

impl ProductBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product and the category names it belongs to.
    pub fn push(&mut self, product: Product, category_names: &[String]) {
        let product_id = product.id;
        match self.product_index.get(&product_id) {
            Some(&pos) => self.products[pos] = product,
            None => {
                self.product_index.insert(product_id, self.products.len());
                self.products.push(product);
            }
        }

        for name in category_names {
            if self.category_names.insert(name.clone()) {
                self.categories.push(NewCategory { name: name.clone() });
            }
            if self.seen_pairs.insert((product_id, name.clone())) {
                self.pairs.push(ProductCategoryPair {
                    product_id,
                    category: name.clone(),
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: DbPool,
}

impl ProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Write a batch in one transaction: upsert products, insert-or-ignore
    /// category names, then insert-or-ignore pairs with category ids
    /// resolved by name.
    pub async fn write_batch(&self, batch: ProductBatch) -> Result<(), DieselError> {
        if batch.is_empty() {
            return Ok(());
        }
        let ProductBatch {
            products,
            categories,
            pairs,
            ..
        } = batch;

        crate::with_conn_split!(self.pool,
            sqlite: conn => {
                type Db = diesel::sqlite::Sqlite;
                conn.transaction(|conn| {
                    let (products, categories, pairs) =
                        (products.clone(), categories.clone(), pairs.clone());
                    Box::pin(async move {
                        for chunk in products.chunks(rows_per_statement::<Product>()) {
                            BatchInsert::new(chunk, PRODUCT_CONFLICT)
                                .into_query::<Db>()
                                .execute(conn)
                                .await?;
                        }
                        for chunk in categories.chunks(rows_per_statement::<NewCategory>()) {
                            BatchInsert::new(chunk, CATEGORY_CONFLICT)
                                .into_query::<Db>()
                                .execute(conn)
                                .await?;
                        }
                        for chunk in pairs.chunks(rows_per_statement::<ProductCategoryPair>()) {
                            BatchInsert::new(chunk, PAIR_CONFLICT)
                                .into_query::<Db>()
                                .execute(conn)
                                .await?;
                        }
                        Ok::<(), DieselError>(())
                    })
                })
                .await
            },
            postgres: conn => {
                type Db = diesel::pg::Pg;
                conn.transaction(|conn| {
                    let (products, categories, pairs) =
                        (products.clone(), categories.clone(), pairs.clone());
                    Box::pin(async move {
                        for chunk in products.chunks(rows_per_statement::<Product>()) {
                            BatchInsert::new(chunk, PRODUCT_CONFLICT)
                                .into_query::<Db>()
                                .execute(conn)
                                .await?;
                        }
                        for chunk in categories.chunks(rows_per_statement::<NewCategory>()) {
                            BatchInsert::new(chunk, CATEGORY_CONFLICT)
                                .into_query::<Db>()
                                .execute(conn)
                                .await?;
                        }
                        for chunk in pairs.chunks(rows_per_statement::<ProductCategoryPair>()) {
                            BatchInsert::new(chunk, PAIR_CONFLICT)
                                .into_query::<Db>()
                                .execute(conn)
                                .await?;
                        }
                        Ok::<(), DieselError>(())
                    })
                })
                .await
            }
        )
    }

    pub async fn get(&self, id: i64) -> Result<Option<Product>, DieselError> {
        with_conn!(self.pool, conn, {
            products::table
                .find(id)
                .first::<ProductRecord>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Product::from))
        })
    }

    /// Categories linked to a product, ordered by name.
    pub async fn categories_for(&self, product_id: i64) -> Result<Vec<Category>, DieselError> {
        with_conn!(self.pool, conn, {
            product_categories::table
                .inner_join(categories::table)
                .filter(product_categories::product_id.eq(product_id))
                .select((categories::id, categories::name))
                .order(categories::name.asc())
                .load::<CategoryRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Category::from).collect())
        })
    }

    pub async fn find_category(&self, name: &str) -> Result<Option<Category>, DieselError> {
        with_conn!(self.pool, conn, {
            categories::table
                .filter(categories::name.eq(name))
                .first::<CategoryRecord>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Category::from))
        })
    }

    pub async fn count(&self) -> Result<u64, DieselError> {
        with_conn!(self.pool, conn, {
            products::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|c| c as u64)
        })
    }

    pub async fn count_categories(&self) -> Result<u64, DieselError> {
        with_conn!(self.pool, conn, {
            categories::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|c| c as u64)
        })
    }

    pub async fn count_pairs(&self) -> Result<u64, DieselError> {
        with_conn!(self.pool, conn, {
            product_categories::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|c| c as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductFields;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    fn product(id: i64, name: &str, abv: i32) -> Product {
        Product::from_fields(
            id,
            ProductFields {
                name: name.to_string(),
                price: 19990,
                alcohol_by_volume: abv,
                volume: 7500,
            },
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn setup() -> (tempfile::TempDir, ProductRepository) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (dir, ctx.products())
    }

    #[test]
    fn test_batch_dedups_categories_and_pairs() {
        let mut batch = ProductBatch::new();
        batch.push(product(1, "A", 120), &names(&["Rødvin", "Frankrike"]));
        batch.push(product(2, "B", 125), &names(&["Rødvin", "Italia"]));
        batch.push(product(1, "A2", 130), &names(&["Rødvin"]));

        assert_eq!(batch.product_count(), 2);
        assert_eq!(batch.category_count(), 3);
        assert_eq!(batch.pair_count(), 4);
        assert_eq!(batch.products[0].name, "A2");
    }

    #[tokio::test]
    async fn test_shared_category_written_once() {
        let (_dir, repo) = setup().await;
        let mut batch = ProductBatch::new();
        batch.push(product(1, "A", 120), &names(&["Rødvin"]));
        batch.push(product(2, "B", 125), &names(&["Rødvin"]));
        repo.write_batch(batch).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.count_categories().await.unwrap(), 1);
        assert_eq!(repo.count_pairs().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_batch_is_idempotent_and_updates() {
        let (_dir, repo) = setup().await;

        let mut batch = ProductBatch::new();
        batch.push(product(1, "Old", 120), &names(&["Rødvin", "Frankrike"]));
        repo.write_batch(batch).await.unwrap();

        let mut batch = ProductBatch::new();
        batch.push(product(1, "New", 120), &names(&["Rødvin", "Frankrike"]));
        repo.write_batch(batch).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get(1).await.unwrap().unwrap().name, "New");
        assert_eq!(repo.count_categories().await.unwrap(), 2);

        let linked: Vec<String> = repo
            .categories_for(1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(linked, names(&["Frankrike", "Rødvin"]));
    }

    #[tokio::test]
    async fn test_existing_category_keeps_its_id() {
        let (_dir, repo) = setup().await;

        let mut batch = ProductBatch::new();
        batch.push(product(1, "A", 120), &names(&["Hvitvin"]));
        repo.write_batch(batch).await.unwrap();
        let before = repo.find_category("Hvitvin").await.unwrap().unwrap();

        let mut batch = ProductBatch::new();
        batch.push(product(2, "B", 110), &names(&["Hvitvin"]));
        repo.write_batch(batch).await.unwrap();
        let after = repo.find_category("Hvitvin").await.unwrap().unwrap();

        assert_eq!(before.id, after.id);
        assert_eq!(repo.categories_for(2).await.unwrap()[0].id, before.id);
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let (_dir, repo) = setup().await;
        repo.write_batch(ProductBatch::new()).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
