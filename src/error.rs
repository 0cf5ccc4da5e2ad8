//! Pipeline-level errors.

use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::fetch::FetchError;
use crate::repository::{is_connection_error, DieselError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] DieselError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Fetcher setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Raw record {0} not found")]
    RecordNotFound(i64),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the database went away, so the phase can be rerun after
    /// reconnecting.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Database(e) => is_connection_error(e),
            _ => false,
        }
    }
}
