//! Per-window and per-run import accounting.

use serde::Serialize;

/// Outcome of one import window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    /// Raw records read.
    pub read: usize,
    /// Products upserted.
    pub imported: usize,
    /// Distinct category names in the window.
    pub categories: usize,
    /// Records whose markup could not be parsed into a usable product,
    /// including ones without a volume.
    pub skipped_parse: usize,
    /// Records dropped for having no alcohol content.
    pub skipped_zero_alcohol: usize,
}

impl WindowReport {
    pub fn skipped(&self) -> usize {
        self.skipped_parse + self.skipped_zero_alcohol
    }
}

/// Window reports summed over one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub windows: usize,
    pub read: usize,
    pub imported: usize,
    pub skipped_parse: usize,
    pub skipped_zero_alcohol: usize,
}

impl ImportSummary {
    pub fn add(&mut self, report: &WindowReport) {
        self.windows += 1;
        self.read += report.read;
        self.imported += report.imported;
        self.skipped_parse += report.skipped_parse;
        self.skipped_zero_alcohol += report.skipped_zero_alcohol;
    }

    pub fn skipped(&self) -> usize {
        self.skipped_parse + self.skipped_zero_alcohol
    }
}
