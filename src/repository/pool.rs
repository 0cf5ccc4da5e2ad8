//! Backend selection and connection checkout.
//!
//! `sqlite:<path>` (or a bare path) opens a fresh SQLite connection for each
//! unit of work. `postgres://` URLs check connections out of a small deadpool
//! pool, which needs the `postgres` feature.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::AsyncConnection;

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::{is_postgres_url, to_connection_error};

pub type DieselError = diesel::result::Error;

pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Connections held by the Postgres pool. Phases run one statement at a time.
#[cfg(feature = "postgres")]
const PG_POOL_SIZE: usize = 2;

/// Opens SQLite connections against one database file.
#[derive(Clone)]
pub struct SqliteConnector {
    path: String,
}

impl SqliteConnector {
    pub fn new(url_or_path: &str) -> Self {
        Self {
            path: url_or_path
                .strip_prefix("sqlite:")
                .unwrap_or(url_or_path)
                .to_string(),
        }
    }

    pub async fn get(&self) -> Result<SqliteConn, DieselError> {
        SqliteConn::establish(&self.path)
            .await
            .map_err(to_connection_error)
    }
}

#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgConnector {
    pool: DeadPool<AsyncPgConnection>,
}

#[cfg(feature = "postgres")]
impl PgConnector {
    pub fn new(url: &str) -> Result<Self, DieselError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
        DeadPool::builder(manager)
            .max_size(PG_POOL_SIZE)
            .build()
            .map(|pool| Self { pool })
            .map_err(to_connection_error)
    }

    pub async fn get(&self) -> Result<PgConn, DieselError> {
        self.pool.get().await.map_err(to_connection_error)
    }
}

/// Either backend, chosen from the database URL.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqliteConnector),
    #[cfg(feature = "postgres")]
    Postgres(PgConnector),
}

impl DbPool {
    pub fn from_url(url: &str) -> Result<Self, DieselError> {
        if !is_postgres_url(url) {
            return Ok(DbPool::Sqlite(SqliteConnector::new(url)));
        }

        #[cfg(feature = "postgres")]
        {
            PgConnector::new(url).map(DbPool::Postgres)
        }
        #[cfg(not(feature = "postgres"))]
        {
            Err(DieselError::QueryBuilderError(
                "built without PostgreSQL support (enable the `postgres` feature)".into(),
            ))
        }
    }

    pub fn sqlite_from_path(path: &Path) -> Self {
        DbPool::Sqlite(SqliteConnector::new(&path.display().to_string()))
    }
}

/// Check out a connection as `$conn` and evaluate `$body` with it,
/// whichever backend the pool holds.
///
/// ```ignore
/// with_conn!(self.pool, conn, {
///     links::table.count().get_result::<i64>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident, $body:expr) => {
        $crate::with_conn_split!($pool,
            sqlite: $conn => $body,
            postgres: $conn => $body
        )
    };
}

/// Like `with_conn!`, with a separate body per backend.
///
/// ```ignore
/// with_conn_split!(self.pool,
///     sqlite: conn => { diesel::replace_into(t).values(&row).execute(&mut conn).await },
///     postgres: conn => { diesel::insert_into(t).values(&row).on_conflict(t::id).do_update().set(&row).execute(&mut conn).await }
/// )
/// ```
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(connector) => {
                let mut $sqlite_conn = connector.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(connector) => {
                let mut $pg_conn = connector.get().await?;
                $pg_body
            }
        }
    }};
}
