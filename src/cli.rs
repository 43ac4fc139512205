//! CLI helper functions

use crate::{
    config::HarvestConfig,
    harvest::{HarvestReport, JiraHarvester},
    progress::ProgressBars,
    storage::{Checkpoint, CheckpointStore, FileCheckpointStore},
};
use eyre::{Context, Result};
use std::path::PathBuf;

/// Settings given on the command line, overriding config file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub projects: Vec<String>,
    pub page_size: Option<u64>,
    pub output: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub dedupe: bool,
}

/// Build the effective configuration
///
/// Layers: defaults or config file, then JIRA_* environment variables, then
/// command line flags.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::load(overrides.config.as_deref())?;
    config.apply_env();

    if !overrides.projects.is_empty() {
        config.projects = overrides.projects.clone();
    }
    if let Some(page_size) = overrides.page_size {
        config.page_size = page_size;
    }
    if let Some(output) = &overrides.output {
        config.output = output.clone();
    }
    if let Some(state) = &overrides.state {
        config.state = state.clone();
    }
    if overrides.dedupe {
        config.dedupe = true;
    }

    config.validate()?;
    Ok(config)
}

/// Harvest every configured project, resuming from the saved checkpoint
///
/// Pipeline: JiraClient → IssueTransformer → NdjsonWriter, checkpointing to
/// the state file after every page
pub async fn run_harvest(config: &HarvestConfig, progress: bool) -> Result<HarvestReport> {
    log::info!(
        "Harvesting {} project(s) from {}",
        config.projects.len(),
        config.base_url
    );
    log::info!("Appending examples to {}", config.output.display());

    let mut harvester =
        JiraHarvester::from_config(config).context("Failed to set up the harvester")?;
    if progress {
        harvester.driver_mut().set_observer(ProgressBars::new());
    }

    let report = harvester.resume().await?;

    log::info!(
        "✓ Harvest complete: {} issue(s) → {} example(s) in {}",
        report.records_fetched(),
        report.examples_written(),
        config.output.display()
    );
    Ok(report)
}

/// Where a harvest stands according to the checkpoint file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestStatus {
    pub checkpoint: Checkpoint,
    /// Projects before the checkpoint, fully harvested
    pub completed: Vec<String>,
    /// Project the next run continues with, if any
    pub current: Option<String>,
    /// Projects not started yet
    pub pending: Vec<String>,
}

impl HarvestStatus {
    pub fn new(checkpoint: Checkpoint, projects: &[String]) -> Self {
        let split = checkpoint.collection_index.min(projects.len());
        let (completed, rest) = projects.split_at(split);
        let (current, pending) = match rest.split_first() {
            Some((current, pending)) => (Some(current.clone()), pending.to_vec()),
            None => (None, Vec::new()),
        };
        Self {
            checkpoint,
            completed: completed.to_vec(),
            current,
            pending,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_none()
    }
}

impl std::fmt::Display for HarvestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Checkpoint: {}", self.checkpoint)?;
        if !self.completed.is_empty() {
            writeln!(f, "Completed: {}", self.completed.join(", "))?;
        }
        match &self.current {
            Some(current) => writeln!(
                f,
                "Next: {} from offset {}",
                current, self.checkpoint.offset
            )?,
            None => writeln!(f, "All projects harvested")?,
        }
        if !self.pending.is_empty() {
            writeln!(f, "Pending: {}", self.pending.join(", "))?;
        }
        Ok(())
    }
}

/// Read the checkpoint and place it against the configured projects
pub fn harvest_status(config: &HarvestConfig) -> Result<HarvestStatus> {
    let checkpoint = FileCheckpointStore::new(&config.state).load()?;
    Ok(HarvestStatus::new(checkpoint, &config.projects))
}

/// Delete the checkpoint so the next run starts from the first project
///
/// Returns whether there was a checkpoint to delete. The output file is left
/// alone.
pub fn reset_state(config: &HarvestConfig) -> Result<bool> {
    let mut store = FileCheckpointStore::new(&config.state);
    let existed = store.path().exists();
    store.clear()?;
    if existed {
        log::info!("✓ Removed checkpoint {}", config.state.display());
    } else {
        log::info!("No checkpoint at {}", config.state.display());
    }
    Ok(existed)
}
