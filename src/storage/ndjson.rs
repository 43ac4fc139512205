//! NDJSON (Newline Delimited JSON) file operations

use crate::etl::Loader;

use eyre::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Items with a stable identity, used to skip re-emitted duplicates
pub trait Identified {
    fn id(&self) -> &str;
}

/// Read NDJSON from a file
pub struct NdjsonReader {
    path: PathBuf,
}

impl NdjsonReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read all lines as JSON values
    pub fn read(&self) -> Result<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse JSON line: {}", line))
            })
            .collect()
    }

    /// Collect the `id` field of every line that has one
    ///
    /// A torn last line (the process died mid-write) is ignored rather than
    /// failing the read.
    pub fn read_ids(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;

        let mut ids = HashSet::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<Value>(line) {
                Ok(value) => {
                    if let Some(id) = value.get("id").and_then(Value::as_str) {
                        ids.insert(id.to_string());
                    }
                }
                Err(e) => log::warn!("Ignoring unreadable line in {}: {}", self.path.display(), e),
            }
        }
        Ok(ids)
    }
}

/// Append-only NDJSON writer
///
/// The file is opened once in append mode and kept open for the writer's
/// lifetime. With deduplication enabled, the ids already present in the file
/// are loaded at open time and items with a known id are skipped.
pub struct NdjsonWriter<T> {
    path: PathBuf,
    writer: BufWriter<File>,
    seen: Option<HashSet<String>>,
    _phantom: PhantomData<fn(T)>,
}

impl<T> NdjsonWriter<T> {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open NDJSON file: {}", path.display()))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            seen: None,
            _phantom: PhantomData,
        })
    }

    /// Open `path` for appending, skipping items whose id is already in it
    pub fn open_deduplicated(path: impl AsRef<Path>) -> Result<Self> {
        let ids = NdjsonReader::new(path.as_ref()).read_ids()?;
        log::info!(
            "Loaded {} existing id(s) from {}",
            ids.len(),
            path.as_ref().display()
        );
        let mut writer = Self::open(path)?;
        writer.seen = Some(ids);
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Serialize + Identified> NdjsonWriter<T> {
    /// Append items as NDJSON lines, returning how many were written
    pub fn append(&mut self, items: &[T]) -> Result<usize> {
        let mut written = 0;
        for item in items {
            if let Some(seen) = self.seen.as_mut() {
                if !seen.insert(item.id().to_string()) {
                    log::debug!("Skipping duplicate {}", item.id());
                    continue;
                }
            }
            serde_json::to_writer(&mut self.writer, item)?;
            self.writer.write_all(b"\n")?;
            written += 1;
        }
        Ok(written)
    }

    /// Flush buffered lines and sync them to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

// Implement Loader trait for appending NDJSON files

impl<T: Serialize + Identified + Send> Loader for NdjsonWriter<T> {
    type Item = T;

    async fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
        self.append(&items)
    }

    async fn flush(&mut self) -> Result<()> {
        self.sync()
    }
}
