//! Status command.

use console::style;

use crate::cli::helpers::with_reconnect;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::repository::redact_url_password;

/// Print catalog counts.
pub async fn cmd_status(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let stats = with_reconnect(settings, |ctx| async move {
        ctx.stats().await.map_err(PipelineError::from)
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n{}", style("Catalog Status").bold());
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {}",
        "Database:",
        redact_url_password(&settings.database_url)
    );
    let config = match &settings.source_path {
        Some(path) => path.display().to_string(),
        None => "(defaults)".to_string(),
    };
    println!("{:<20} {}", "Config:", config);
    println!("{:<20} {}", "Links:", stats.links);
    println!("{:<20} {}", "  uncrawled:", stats.uncrawled);
    println!("{:<20} {}", "Raw records:", stats.raw_products);
    println!("{:<20} {}", "Products:", stats.products);
    println!("{:<20} {}", "Categories:", stats.categories);
    Ok(())
}
