//! Progress reporting for harvest runs
//!
//! The pagination driver reports what happened to each page through a
//! [`HarvestObserver`]. Observers only watch; they never affect what gets
//! fetched or checkpointed.

use crate::etl::CollectionReport;
use indicatif::{ProgressBar, ProgressStyle};

/// What a single processed page contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// Records returned by the source
    pub fetched: u64,
    /// Examples appended to the sink
    pub written: usize,
    /// Records that produced no examples
    pub skipped: usize,
    /// Offset after this page, as checkpointed
    pub offset: u64,
    pub total: u64,
}

/// Receives driver events
pub trait HarvestObserver: Send {
    fn collection_started(&mut self, _collection: &str, _total: u64, _offset: u64) {}

    fn page_completed(&mut self, _collection: &str, _page: &PageProgress) {}

    fn collection_finished(&mut self, _report: &CollectionReport) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl HarvestObserver for NoProgress {}

/// One console progress bar per collection
#[derive(Default)]
pub struct ProgressBars {
    bar: Option<ProgressBar>,
}

impl ProgressBars {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Create a progress bar counting issues of a collection
pub fn create_issue_progress(total: u64, collection: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} issues ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(format!("Scraping {}", collection));
    pb
}

impl HarvestObserver for ProgressBars {
    fn collection_started(&mut self, collection: &str, total: u64, offset: u64) {
        let pb = create_issue_progress(total, collection);
        pb.set_position(offset.min(total));
        self.bar = Some(pb);
    }

    fn page_completed(&mut self, _collection: &str, page: &PageProgress) {
        if let Some(pb) = &self.bar {
            pb.inc(page.fetched);
        }
    }

    fn collection_finished(&mut self, report: &CollectionReport) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message(format!(
                "{}: {} example(s) written",
                report.collection, report.examples_written
            ));
        }
    }
}
