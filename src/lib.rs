//! Jira Harvest
//!
//! Resumable, page-by-page harvesting of Jira issues into an
//! instruction-tuning corpus

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod etl;
pub mod harvest;
pub mod progress;
pub mod storage;

// Re-exports for convenience
pub use client::{JiraClient, RetryPolicy};
pub use config::HarvestConfig;
pub use error::{FetchError, HarvestError, TransformError};
pub use etl::{Loader, Page, PageExtractor, PaginationDriver, Transformer};
pub use harvest::{HarvestReport, IssueTransformer, JiraHarvester, Orchestrator, TrainingExample};
pub use storage::{Checkpoint, CheckpointStore, FileCheckpointStore, NdjsonReader, NdjsonWriter};
