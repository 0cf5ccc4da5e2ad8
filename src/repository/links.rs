//! Link catalog repository.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::batch::{rows_per_statement, BatchInsert, OnConflict};
use super::pool::{DbPool, DieselError};
use super::records::LinkRecord;
use crate::models::Link;
use crate::schema::links;
use crate::{with_conn, with_conn_split};

const LINK_CONFLICT: OnConflict = OnConflict::DoUpdate {
    target: &["id"],
    update: &["loc", "image", "crawled"],
};

#[derive(Clone)]
pub struct LinkRepository {
    pool: DbPool,
}

impl LinkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upsert links in one transaction, overwriting location, image and the
    /// crawled flag of existing rows.
    ///
    /// Duplicate ids collapse to the last occurrence. Returns the number of
    /// distinct links written.
    pub async fn upsert_links(&self, links: &[Link]) -> Result<usize, DieselError> {
        let rows = dedup_last_wins(links);
        if rows.is_empty() {
            return Ok(0);
        }
        let written = rows.len();

        with_conn_split!(self.pool,
            sqlite: conn => {
                conn.transaction(|conn| {
                    let rows = rows.clone();
                    Box::pin(async move {
                        for chunk in rows.chunks(rows_per_statement::<Link>()) {
                            BatchInsert::new(chunk, LINK_CONFLICT)
                                .into_query::<diesel::sqlite::Sqlite>()
                                .execute(conn)
                                .await?;
                        }
                        Ok::<(), DieselError>(())
                    })
                })
                .await?;
            },
            postgres: conn => {
                conn.transaction(|conn| {
                    let rows = rows.clone();
                    Box::pin(async move {
                        for chunk in rows.chunks(rows_per_statement::<Link>()) {
                            BatchInsert::new(chunk, LINK_CONFLICT)
                                .into_query::<diesel::pg::Pg>()
                                .execute(conn)
                                .await?;
                        }
                        Ok::<(), DieselError>(())
                    })
                })
                .await?;
            }
        );

        Ok(written)
    }

    /// Number of links not yet crawled.
    pub async fn count_uncrawled(&self) -> Result<u64, DieselError> {
        with_conn!(self.pool, conn, {
            links::table
                .filter(links::crawled.eq(false))
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|c| c as u64)
        })
    }

    /// Total number of links.
    pub async fn count(&self) -> Result<u64, DieselError> {
        with_conn!(self.pool, conn, {
            links::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|c| c as u64)
        })
    }

    /// The uncrawled link with the lowest id.
    pub async fn next_uncrawled(&self) -> Result<Option<Link>, DieselError> {
        self.next_uncrawled_after(None).await
    }

    /// The uncrawled link with the lowest id greater than `after`.
    ///
    /// Passing the last attempted id walks the pending links in id order
    /// without revisiting ones that failed earlier in the walk.
    pub async fn next_uncrawled_after(
        &self,
        after: Option<i64>,
    ) -> Result<Option<Link>, DieselError> {
        with_conn!(self.pool, conn, {
            let mut query = links::table
                .filter(links::crawled.eq(false))
                .order(links::id.asc())
                .into_boxed();
            if let Some(after) = after {
                query = query.filter(links::id.gt(after));
            }
            query
                .first::<LinkRecord>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Link::from))
        })
    }

    /// Look up a link by id.
    pub async fn get(&self, id: i64) -> Result<Option<Link>, DieselError> {
        with_conn!(self.pool, conn, {
            links::table
                .find(id)
                .first::<LinkRecord>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Link::from))
        })
    }
}

/// Collapse duplicate ids, keeping the last occurrence at the position of
/// the first.
fn dedup_last_wins(links: &[Link]) -> Vec<Link> {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(links.len());
    let mut rows: Vec<Link> = Vec::with_capacity(links.len());
    for link in links {
        match index.get(&link.id) {
            Some(&pos) => rows[pos] = link.clone(),
            None => {
                index.insert(link.id, rows.len());
                rows.push(link.clone());
            }
        }
    }
    rows
}
