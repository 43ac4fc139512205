//! Multi-project harvest orchestration

use super::IssueTransformer;
use super::training::TrainingExample;
use crate::client::JiraClient;
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::etl::{CollectionReport, Loader, PageExtractor, PaginationDriver, Transformer};
use crate::storage::{Checkpoint, CheckpointStore, FileCheckpointStore, NdjsonWriter};
use eyre::Result;

/// Orchestrator wired to Jira, the NDJSON corpus and the checkpoint file
pub type JiraHarvester = Orchestrator<
    JiraClient,
    IssueTransformer,
    NdjsonWriter<TrainingExample>,
    FileCheckpointStore,
>;

/// What a run harvested
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Checkpoint the run resumed from
    pub start: Checkpoint,
    /// One report per collection harvested, in order
    pub collections: Vec<CollectionReport>,
}

impl HarvestReport {
    pub fn records_fetched(&self) -> u64 {
        self.collections.iter().map(|c| c.records_fetched).sum()
    }

    pub fn examples_written(&self) -> usize {
        self.collections.iter().map(|c| c.examples_written).sum()
    }

    pub fn records_skipped(&self) -> usize {
        self.collections.iter().map(|c| c.records_skipped).sum()
    }
}

/// Walks the collections in order, resuming from a checkpoint
///
/// Only the first collection visited starts at the checkpoint's offset;
/// every later one starts at 0. Once a collection is exhausted the
/// checkpoint moves to the start of the next one, so a restart never
/// revisits finished collections.
pub struct Orchestrator<E, T, L, C> {
    collections: Vec<String>,
    driver: PaginationDriver<E, T, L, C>,
}

impl<E, T, L, C> Orchestrator<E, T, L, C>
where
    E: PageExtractor,
    T: Transformer<Input = serde_json::Value>,
    L: Loader<Item = T::Output>,
    C: CheckpointStore,
{
    pub fn new(collections: Vec<String>, driver: PaginationDriver<E, T, L, C>) -> Self {
        Self {
            collections,
            driver,
        }
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn driver(&self) -> &PaginationDriver<E, T, L, C> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut PaginationDriver<E, T, L, C> {
        &mut self.driver
    }

    pub fn into_driver(self) -> PaginationDriver<E, T, L, C> {
        self.driver
    }

    /// Run from the checkpoint saved in the driver's store
    ///
    /// # Errors
    /// Fails before fetching anything if the saved checkpoint is unreadable
    pub async fn resume(&mut self) -> Result<HarvestReport, HarvestError> {
        let initial = self.driver.checkpoints().load()?;
        self.run(initial).await
    }

    /// Harvest every collection from `initial` onward
    ///
    /// # Errors
    /// Stops at the first collection whose driver run fails; the checkpoint
    /// then still points inside that collection.
    pub async fn run(&mut self, initial: Checkpoint) -> Result<HarvestReport, HarvestError> {
        let mut report = HarvestReport {
            start: initial,
            collections: Vec::new(),
        };

        if initial.collection_index >= self.collections.len() && !self.collections.is_empty() {
            log::info!(
                "Checkpoint is past the last project ({}), nothing to do",
                initial
            );
        }

        for (index, collection) in self
            .collections
            .iter()
            .enumerate()
            .skip(initial.collection_index)
        {
            let offset = if index == initial.collection_index {
                initial.offset
            } else {
                0
            };

            log::info!("--- Starting Project: {} ---", collection);
            let collection_report = self.driver.run_collection(index, collection, offset).await?;

            let next = Checkpoint::new(index, collection_report.end_offset).next_collection();
            self.driver.checkpoints_mut().save(&next)?;

            log::info!(
                "Finished {}: {} issue(s), {} example(s), {} skipped",
                collection,
                collection_report.records_fetched,
                collection_report.examples_written,
                collection_report.records_skipped
            );
            report.collections.push(collection_report);
        }

        Ok(report)
    }
}

impl JiraHarvester {
    /// Wire up a harvester from configuration
    ///
    /// Opens the output file in append mode and prepares the checkpoint
    /// store; nothing is fetched yet.
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        config.validate()?;

        let client = JiraClient::try_new(
            config.url()?,
            config.request_timeout(),
            config.retry_policy(),
        )?;
        let writer = if config.dedupe {
            NdjsonWriter::open_deduplicated(&config.output)?
        } else {
            NdjsonWriter::open(&config.output)?
        };
        let checkpoints = FileCheckpointStore::new(&config.state);

        let driver = PaginationDriver::new(client, IssueTransformer, writer, checkpoints)
            .with_settings(config.driver_settings());

        Ok(Self::new(config.projects.clone(), driver))
    }
}
