//! Raw product markup store.

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::pool::{DbPool, DieselError};
use super::records::RawProductRecord;
use crate::models::RawRecord;
use crate::schema::{links, raw_products};
use crate::{with_conn, with_conn_split};

#[derive(Clone)]
pub struct RawProductRepository {
    pool: DbPool,
}

impl RawProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a cleaned fragment and mark its link crawled, atomically.
    ///
    /// Storing the same id again replaces the markup.
    pub async fn store_and_mark_crawled(&self, id: i64, html: &str) -> Result<(), DieselError> {
        let record = RawProductRecord {
            id,
            html: html.to_string(),
        };

        with_conn_split!(self.pool,
            sqlite: conn => {
                conn.transaction(|conn| {
                    let record = record.clone();
                    Box::pin(async move {
                        diesel::replace_into(raw_products::table)
                            .values(&record)
                            .execute(conn)
                            .await?;
                        diesel::update(links::table.find(record.id))
                            .set(links::crawled.eq(true))
                            .execute(conn)
                            .await?;
                        Ok::<(), DieselError>(())
                    })
                })
                .await
            },
            postgres: conn => {
                use diesel::upsert::excluded;
                conn.transaction(|conn| {
                    let record = record.clone();
                    Box::pin(async move {
                        diesel::insert_into(raw_products::table)
                            .values(&record)
                            .on_conflict(raw_products::id)
                            .do_update()
                            .set(raw_products::html.eq(excluded(raw_products::html)))
                            .execute(conn)
                            .await?;
                        diesel::update(links::table.find(record.id))
                            .set(links::crawled.eq(true))
                            .execute(conn)
                            .await?;
                        Ok::<(), DieselError>(())
                    })
                })
                .await
            }
        )
    }

    /// Read one window of records ordered by id.
    pub async fn window(&self, offset: u64, limit: u64) -> Result<Vec<RawRecord>, DieselError> {
        with_conn!(self.pool, conn, {
            raw_products::table
                .order(raw_products::id.asc())
                .offset(offset as i64)
                .limit(limit as i64)
                .load::<RawProductRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(RawRecord::from).collect())
        })
    }

    pub async fn get(&self, id: i64) -> Result<Option<RawRecord>, DieselError> {
        with_conn!(self.pool, conn, {
            raw_products::table
                .find(id)
                .first::<RawProductRecord>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(RawRecord::from))
        })
    }

    pub async fn count(&self) -> Result<u64, DieselError> {
        with_conn!(self.pool, conn, {
            raw_products::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|c| c as u64)
        })
    }
}
