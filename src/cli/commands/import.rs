//! Import command.

use std::sync::Arc;

use console::style;

use crate::cli::helpers::{print_header, print_row, progress_bar, with_reconnect};
use crate::config::Settings;
use crate::extract::{Extractor, ProductPageExtractor};
use crate::import::{BatchImporter, ImportSummary, WindowReport};

/// Import raw records into products and categories, or a single record with
/// `id`.
pub async fn cmd_import(settings: &Settings, id: Option<i64>) -> anyhow::Result<()> {
    let extractor: Arc<dyn Extractor> = Arc::new(ProductPageExtractor::new());

    if let Some(id) = id {
        print_header(&format!("Importing raw record {}", id));
        let report = with_reconnect(settings, |ctx| {
            let importer = BatchImporter::new(ctx, extractor.clone());
            async move { importer.import_one(id).await }
        })
        .await?;
        print_window(&report);
        return Ok(());
    }

    print_header(&format!(
        "Importing raw records in windows of {}",
        settings.import_window
    ));
    let pb = progress_bar("import");
    let result = with_reconnect(settings, |ctx| {
        let importer = BatchImporter::new(ctx, extractor.clone())
            .with_window(settings.import_window)
            .with_progress(pb.clone());
        async move { importer.run_import().await }
    })
    .await;
    pb.finish_and_clear();

    print_summary(&result?);
    Ok(())
}

fn print_window(report: &WindowReport) {
    if report.imported > 0 {
        println!("{} Imported", style("✓").green());
    } else {
        println!("{} Skipped", style("!").yellow());
    }
    print_row("Categories", report.categories);
    print_row("Parse failures", report.skipped_parse);
    print_row("No alcohol", report.skipped_zero_alcohol);
}

fn print_summary(summary: &ImportSummary) {
    println!("\n{} Import complete:", style("✓").green());
    print_row("Windows", style(summary.windows).dim());
    print_row("Records read", style(summary.read).dim());
    print_row("Products imported", style(summary.imported).green());
    print_row("Records skipped", style(summary.skipped()).yellow());
    if summary.skipped_parse > 0 {
        print_row("  parse failures", style(summary.skipped_parse).yellow());
    }
    if summary.skipped_zero_alcohol > 0 {
        print_row("  no alcohol", style(summary.skipped_zero_alcohol).yellow());
    }
}
