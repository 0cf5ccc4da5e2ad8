//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::error::PipelineError;
use crate::repository::{redact_url_password, DbContext};

/// Connect to the database and create the schema.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    // connect_with_retry bootstraps the schema before returning
    DbContext::connect_with_retry(&settings.database_url, settings.connect_backoff())
        .await
        .map_err(PipelineError::from)?;

    println!(
        "{} Initialized database {}",
        style("✓").green(),
        redact_url_password(&settings.database_url)
    );
    Ok(())
}
