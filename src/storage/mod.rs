//! File system storage operations
//!
//! This module handles the two durable artifacts of a harvest:
//! - The append-only NDJSON corpus of training examples
//! - The checkpoint that marks where to resume

mod checkpoint;
mod ndjson;

pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use ndjson::{Identified, NdjsonReader, NdjsonWriter};
