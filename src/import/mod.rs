//! Batched parse-and-upsert import from the raw store.

mod report;

pub use report::{ImportSummary, WindowReport};

use std::sync::Arc;

use indicatif::ProgressBar;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::models::{Product, RawRecord};
use crate::repository::{DbContext, ProductBatch};

/// Raw records per window when none is configured.
pub const DEFAULT_WINDOW: u64 = 1000;

/// Walks raw records in id order, one transaction per window.
pub struct BatchImporter {
    ctx: DbContext,
    extractor: Arc<dyn Extractor>,
    window: u64,
    progress: Option<ProgressBar>,
}

impl BatchImporter {
    pub fn new(ctx: DbContext, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            ctx,
            extractor,
            window: DEFAULT_WINDOW,
            progress: None,
        }
    }

    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window.max(1);
        self
    }

    /// Report imported records on a progress bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Import every raw record, window by window, until a window comes back
    /// empty.
    pub async fn run_import(&self) -> Result<ImportSummary, PipelineError> {
        let raw = self.ctx.raw_products();
        let mut summary = ImportSummary::default();

        if let Some(pb) = &self.progress {
            pb.set_length(raw.count().await?);
        }

        let mut offset = 0u64;
        loop {
            info!(
                "Importing records {} to {}",
                offset,
                offset + self.window
            );
            let records = raw.window(offset, self.window).await?;
            if records.is_empty() {
                info!("No more records to import");
                break;
            }

            let report = self.process_window(&records, summary.skipped()).await?;
            summary.add(&report);

            if let Some(pb) = &self.progress {
                pb.inc(records.len() as u64);
            }
            offset += self.window;
        }

        Ok(summary)
    }

    /// Extract, filter and write one window in a single transaction.
    pub async fn import_window(&self, records: &[RawRecord]) -> Result<WindowReport, PipelineError> {
        self.process_window(records, 0).await
    }

    /// Re-import a single raw record through the window path.
    pub async fn import_one(&self, id: i64) -> Result<WindowReport, PipelineError> {
        let record = self
            .ctx
            .raw_products()
            .get(id)
            .await?
            .ok_or(PipelineError::RecordNotFound(id))?;
        self.import_window(std::slice::from_ref(&record)).await
    }

    async fn process_window(
        &self,
        records: &[RawRecord],
        skipped_before: usize,
    ) -> Result<WindowReport, PipelineError> {
        let mut report = WindowReport {
            read: records.len(),
            ..WindowReport::default()
        };
        let mut batch = ProductBatch::new();

        for record in records {
            let (fields, categories) = match self.extractor.extract_fields(&record.html, record.id) {
                Ok(extracted) => extracted,
                Err(e) => {
                    report.skipped_parse += 1;
                    error!(
                        "{} - Failed to get product details for product {}. {}",
                        skipped_before + report.skipped(),
                        record.id,
                        e
                    );
                    continue;
                }
            };

            if fields.alcohol_by_volume == 0 {
                report.skipped_zero_alcohol += 1;
                info!(
                    "{} - Product {} ({}) has no alcohol content. Skipping.",
                    skipped_before + report.skipped(),
                    fields.name,
                    record.id
                );
                continue;
            }

            if fields.volume == 0 {
                report.skipped_parse += 1;
                error!(
                    "{} - Product {} ({}) has no volume. Skipping.",
                    skipped_before + report.skipped(),
                    fields.name,
                    record.id
                );
                continue;
            }

            batch.push(Product::from_fields(record.id, fields), &categories);
        }

        report.imported = batch.product_count();
        report.categories = batch.category_count();
        self.ctx.products().write_batch(batch).await?;
        Ok(report)
    }
}
