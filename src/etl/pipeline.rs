//! Pagination driver: walks one collection page by page
//!
//! Per page the driver goes through
//! `Fetching -> Processing -> Checkpointing -> (Fetching | Exhausted)`:
//!
//! 1. Fetch the page at the current offset. Failures never move the offset.
//! 2. Transform every record and append the examples to the loader in order.
//! 3. Flush the loader, advance the offset by the number of records fetched
//!    and save the checkpoint.
//!
//! The collection is exhausted when a page comes back empty or the offset
//! reaches the total captured from the first page.

use super::{Loader, PageExtractor, Transformer};
use crate::error::{FetchError, HarvestError};
use crate::progress::{HarvestObserver, NoProgress, PageProgress};
use crate::storage::{Checkpoint, CheckpointStore};
use std::time::Duration;

/// Knobs of the pagination driver
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Records requested per page
    pub page_size: u64,
    /// Consecutive rejected or unexpected failures tolerated on one page
    pub max_page_failures: u32,
    /// Pause before retrying a page after a rejected or unexpected failure
    pub failure_cooldown: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_page_failures: 5,
            failure_cooldown: Duration::from_secs(30),
        }
    }
}

/// Outcome of harvesting one collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub collection: String,
    pub collection_index: usize,
    pub start_offset: u64,
    pub end_offset: u64,
    /// Total reported by the first page
    pub total: u64,
    pub pages: usize,
    pub records_fetched: u64,
    pub examples_written: usize,
    /// Records that produced no examples
    pub records_skipped: usize,
}

impl CollectionReport {
    pub fn new(collection: impl Into<String>, collection_index: usize, start_offset: u64) -> Self {
        Self {
            collection: collection.into(),
            collection_index,
            start_offset,
            end_offset: start_offset,
            ..Default::default()
        }
    }
}

/// Drives one collection at a time through extract, transform and load,
/// checkpointing after every page
///
/// # Type Parameters
/// - `E`: Page extractor
/// - `T`: Transformer from `E`'s raw records
/// - `L`: Loader of `T::Output`
/// - `C`: Checkpoint store
pub struct PaginationDriver<E, T, L, C> {
    extractor: E,
    transformer: T,
    loader: L,
    checkpoints: C,
    observer: Box<dyn HarvestObserver>,
    settings: DriverSettings,
}

impl<E, T, L, C> PaginationDriver<E, T, L, C>
where
    E: PageExtractor,
    T: Transformer<Input = serde_json::Value>,
    L: Loader<Item = T::Output>,
    C: CheckpointStore,
{
    /// Create a new driver
    pub fn new(extractor: E, transformer: T, loader: L, checkpoints: C) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            checkpoints,
            observer: Box::new(NoProgress),
            settings: DriverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: impl HarvestObserver + 'static) -> Self {
        self.set_observer(observer);
        self
    }

    pub fn set_observer(&mut self, observer: impl HarvestObserver + 'static) {
        self.observer = Box::new(observer);
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn checkpoints(&self) -> &C {
        &self.checkpoints
    }

    pub fn checkpoints_mut(&mut self) -> &mut C {
        &mut self.checkpoints
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Harvest `collection` from `start_offset` until it is exhausted
    ///
    /// The checkpoint saved after each page is `(collection_index, offset)`.
    /// Moving on to the next collection is the caller's decision.
    ///
    /// # Errors
    /// - [`HarvestError::Paused`] when transient failures outlast the retry layer
    /// - [`HarvestError::Rejected`] / [`HarvestError::Exhausted`] when the same
    ///   page keeps failing
    /// - [`HarvestError::Storage`] when examples or the checkpoint cannot be written
    pub async fn run_collection(
        &mut self,
        collection_index: usize,
        collection: &str,
        start_offset: u64,
    ) -> Result<CollectionReport, HarvestError> {
        let mut report = CollectionReport::new(collection, collection_index, start_offset);
        let mut offset = start_offset;
        let mut total: Option<u64> = None;
        let mut failures: u32 = 0;

        log::info!("Harvesting {} from offset {}", collection, offset);

        loop {
            // Fetching
            let page = match self
                .extractor
                .extract_page(collection, offset, self.settings.page_size)
                .await
            {
                Ok(page) => {
                    failures = 0;
                    page
                }
                Err(err) => {
                    failures += 1;
                    self.handle_fetch_failure(collection, offset, err, failures)
                        .await?;
                    continue;
                }
            };

            let total = *total.get_or_insert_with(|| {
                log::info!("Found {} total issues for {}", page.total, collection);
                self.observer.collection_started(collection, page.total, offset);
                page.total
            });
            report.total = total;

            if page.is_empty() {
                log::info!("No more issues found for {}", collection);
                break;
            }

            // Processing
            let fetched = page.len() as u64;
            let mut examples = Vec::new();
            let mut skipped = 0;
            for record in &page.records {
                match self.transformer.transform(record) {
                    Ok(items) if items.is_empty() => skipped += 1,
                    Ok(items) => examples.extend(items),
                    Err(e) => {
                        log::warn!(
                            "Failed to process issue {}: {}. Skipping.",
                            record
                                .get("key")
                                .and_then(serde_json::Value::as_str)
                                .unwrap_or("<no key>"),
                            e
                        );
                        skipped += 1;
                    }
                }
            }

            let written = self.loader.load(examples).await?;
            self.loader.flush().await?;

            // Checkpointing
            offset += fetched;
            self.checkpoints
                .save(&Checkpoint::new(collection_index, offset))?;

            report.pages += 1;
            report.records_fetched += fetched;
            report.examples_written += written;
            report.records_skipped += skipped;
            report.end_offset = offset;

            log::debug!(
                "{}: fetched {} issue(s), wrote {} example(s), offset now {}/{}",
                collection,
                fetched,
                written,
                offset,
                total
            );
            self.observer.page_completed(
                collection,
                &PageProgress {
                    fetched,
                    written,
                    skipped,
                    offset,
                    total,
                },
            );

            if offset >= total {
                log::info!("Completed all issues for {}", collection);
                break;
            }
        }

        self.observer.collection_finished(&report);
        Ok(report)
    }

    /// Decide what a failed fetch means for the run
    ///
    /// Returns `Ok(())` when the same page should be fetched again.
    async fn handle_fetch_failure(
        &mut self,
        collection: &str,
        offset: u64,
        err: FetchError,
        attempts: u32,
    ) -> Result<(), HarvestError> {
        match err {
            FetchError::Transient(_) => {
                log::error!(
                    "Giving up on {} at offset {} for now: {}",
                    collection,
                    offset,
                    err
                );
                Err(HarvestError::Paused {
                    collection: collection.to_string(),
                    offset,
                    source: err,
                })
            }
            FetchError::Rejected { status, ref body } => {
                log::error!("HTTP Error: {} {}", status, body);
                if attempts >= self.settings.max_page_failures {
                    return Err(HarvestError::Rejected {
                        collection: collection.to_string(),
                        offset,
                        status,
                        attempts,
                    });
                }
                self.cool_down(attempts).await;
                Ok(())
            }
            FetchError::Unexpected(_) => {
                log::error!("An unexpected error occurred: {}", err);
                if attempts >= self.settings.max_page_failures {
                    return Err(HarvestError::Exhausted {
                        collection: collection.to_string(),
                        offset,
                        attempts,
                        source: err,
                    });
                }
                self.cool_down(attempts).await;
                Ok(())
            }
        }
    }

    async fn cool_down(&self, attempts: u32) {
        log::warn!(
            "Retrying in {:?} (attempt {}/{})",
            self.settings.failure_cooldown,
            attempts + 1,
            self.settings.max_page_failures
        );
        tokio::time::sleep(self.settings.failure_cooldown).await;
    }
}
