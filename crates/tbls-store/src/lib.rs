//! Summary Persistence
//!
//! Keyed storage for [`DkgSummary`] records: one row per epoch, keyed by
//! magic block number, written once and never mutated. A record is
//! superseded only by the next epoch's record under its own key.
//!
//! Two backends are provided: an in-memory store for tests and embedded use,
//! and a JSON-file store for node data directories.

use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tbls_dkg::DkgSummary;
use thiserror::Error;
use tracing::debug;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no summary stored for epoch {0}")]
    NotFound(i64),
    #[error("summary for epoch {0} already written")]
    AlreadyExists(i64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Keyed read/write surface for epoch summaries
pub trait SummaryStore {
    /// Persist a summary under its epoch key; rejects overwrites
    fn write(&self, summary: &DkgSummary) -> Result<()>;

    /// Load the summary for an epoch
    fn read(&self, epoch: i64) -> Result<DkgSummary>;
}

/// In-memory summary store
#[derive(Default)]
pub struct MemoryStore {
    summaries: DashMap<i64, DkgSummary>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            summaries: DashMap::new(),
        }
    }
}

impl SummaryStore for MemoryStore {
    fn write(&self, summary: &DkgSummary) -> Result<()> {
        let key = summary.key();
        if self.summaries.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        self.summaries.insert(key, summary.clone());
        debug!(epoch = key, "summary stored");
        Ok(())
    }

    fn read(&self, epoch: i64) -> Result<DkgSummary> {
        self.summaries
            .get(&epoch)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(epoch))
    }
}

/// One JSON file per epoch under a node's data directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, epoch: i64) -> PathBuf {
        self.dir.join(format!("summary.{epoch}.json"))
    }
}

impl SummaryStore for FileStore {
    fn write(&self, summary: &DkgSummary) -> Result<()> {
        let path = self.path(summary.key());
        if path.exists() {
            return Err(StoreError::AlreadyExists(summary.key()));
        }
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json)?;
        debug!(epoch = summary.key(), path = %path.display(), "summary written");
        Ok(())
    }

    fn read(&self, epoch: i64) -> Result<DkgSummary> {
        let path = self.path(epoch);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(epoch))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }
}
