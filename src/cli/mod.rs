//! Command-line interface.
//!
//! Parses arguments, resolves settings and dispatches to one pipeline phase.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "alkis")]
#[command(about = "Product catalog crawler and importer")]
#[command(version)]
pub struct Cli {
    /// Config file path (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL (sqlite:<path> or postgres://...)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,

    /// Fetch the sitemap and store product links (does not crawl)
    Discover,

    /// Crawl pending links into the raw store, discovering first if none are pending
    Crawl {
        /// Stop after this many links
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Parse raw records into products and categories
    Import {
        /// Raw records per transaction
        #[arg(short, long)]
        window: Option<u64>,
        /// Re-import a single raw record by id
        #[arg(long)]
        id: Option<i64>,
    },

    /// Show catalog counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).await?;
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }
    settings.validate()?;

    match cli.command {
        Commands::Init => commands::cmd_init(&settings).await,
        Commands::Discover => commands::cmd_discover(&settings).await,
        Commands::Crawl { limit } => commands::cmd_crawl(&settings, limit).await,
        Commands::Import { window, id } => {
            if let Some(window) = window {
                settings.import_window = window.max(1);
            }
            commands::cmd_import(&settings, id).await
        }
        Commands::Status { json } => commands::cmd_status(&settings, json).await,
    }
}
