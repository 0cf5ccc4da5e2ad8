//! Repository layer for database persistence.
//!
//! All database access goes through Diesel. SQLite is always available;
//! PostgreSQL is enabled with the `postgres` feature.

pub mod batch;
pub mod context;
pub mod links;
pub mod pool;
pub mod products;
pub mod raw;
pub mod records;
pub mod util;

pub use context::{CatalogStats, DbContext};
pub use links::LinkRepository;
pub use pool::{DbPool, DieselError};
pub use products::{ProductBatch, ProductRepository};
pub use raw::RawProductRepository;
pub use util::{is_connection_error, redact_url_password};
