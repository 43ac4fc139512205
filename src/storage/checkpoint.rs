//! Durable harvest progress
//!
//! The checkpoint is a single JSON object rewritten in place:
//!
//! ```json
//! {"current_project_index": 1, "current_start_at": 300}
//! ```

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Resume position: the next record to fetch is `offset` within the
/// collection at `collection_index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "current_project_index")]
    pub collection_index: usize,
    #[serde(rename = "current_start_at")]
    pub offset: u64,
}

impl Checkpoint {
    pub fn new(collection_index: usize, offset: u64) -> Self {
        Self {
            collection_index,
            offset,
        }
    }

    /// Position at the start of the collection after this one
    pub fn next_collection(&self) -> Self {
        Self::new(self.collection_index + 1, 0)
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "collection #{} at offset {}",
            self.collection_index, self.offset
        )
    }
}

/// Storage for the single current checkpoint
pub trait CheckpointStore: Send {
    /// Read the saved checkpoint, or the default `(0, 0)` when none exists
    ///
    /// # Errors
    /// Returns an error when saved state exists but cannot be read. Progress
    /// is never silently reset.
    fn load(&self) -> Result<Checkpoint>;

    /// Replace the saved checkpoint
    ///
    /// # Errors
    /// Returns an error if the checkpoint could not be made durable
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()>;

    /// Forget any saved checkpoint
    ///
    /// # Errors
    /// Returns an error if existing state could not be removed
    fn clear(&mut self) -> Result<()>;
}

/// Checkpoint stored as a JSON file
///
/// Saves go through a sibling temp file that is synced and then renamed over
/// the target, so readers see either the old or the new checkpoint.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Checkpoint> {
        if !self.path.exists() {
            log::debug!(
                "No checkpoint at {}, starting from the beginning",
                self.path.display()
            );
            return Ok(Checkpoint::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read checkpoint: {}", self.path.display()))?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt checkpoint file: {}", self.path.display()))?;

        log::debug!("Loaded checkpoint: {}", checkpoint);
        Ok(checkpoint)
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        let body = serde_json::to_vec(checkpoint)?;
        let mut file = std::fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(&body)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace checkpoint: {}", self.path.display()))?;

        sync_parent_dir(&self.path)?;

        log::trace!("Saved checkpoint: {}", checkpoint);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Directory holding `path`; a bare file name lives in the current directory
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Persist a rename by syncing the directory entry
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = parent_dir(path);
    std::fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .with_context(|| format!("Failed to sync directory {}", parent.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

/// Checkpoint kept in memory, recording every save
///
/// Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    current: Option<Checkpoint>,
    history: Vec<Checkpoint>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already saved checkpoint
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            current: Some(checkpoint),
            history: Vec::new(),
        }
    }

    /// Every checkpoint saved so far, oldest first
    pub fn history(&self) -> &[Checkpoint] {
        &self.history
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<Checkpoint> {
        Ok(self.current.unwrap_or_default())
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        self.current = Some(*checkpoint);
        self.history.push(*checkpoint);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}
