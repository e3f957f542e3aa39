// src/crawl/store.rs
// =============================================================================
// Append-only collection of PageRecords shared by concurrent page handlers.
//
// All mutation goes through append(), behind a single mutex. Records are never
// updated once stored, and there is at most one record per normalized URL.
//
// Checkpoints are full snapshots written to a temp file and renamed over the
// previous checkpoint. Writing the same store twice yields the same file, and a
// crash mid-write leaves the older snapshot intact.
// =============================================================================

use crate::error::StoreError;
use crate::record::PageRecord;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<PageRecord>,
    urls: HashSet<String>,
}

/// Cheap to clone; every clone appends to the same collection.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    inner: Arc<Mutex<Inner>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from existing records, keeping the first record per URL.
    pub fn from_records(records: impl IntoIterator<Item = PageRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.append(record);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking handler cannot leave a half-appended record behind
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `record` unless its URL already has one. Returns whether it was stored.
    pub fn append(&self, record: PageRecord) -> bool {
        let mut inner = self.lock();
        if !inner.urls.insert(record.url.clone()) {
            debug!("Record for {} already exists, ignoring duplicate", record.url);
            return false;
        }
        inner.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all records in append order.
    pub fn snapshot(&self) -> Vec<PageRecord> {
        self.lock().records.clone()
    }

    /// Writes the full record list to `path`. Returns the number of records written.
    pub async fn checkpoint(&self, path: &Path) -> Result<usize, StoreError> {
        let records = self.snapshot();
        let json = serde_json::to_vec_pretty(&records).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|source| io_error(&tmp_path, source))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|source| io_error(path, source))?;

        debug!("Checkpointed {} record(s) to {}", records.len(), path.display());
        Ok(records.len())
    }

    /// Loads a checkpoint written by [`RecordStore::checkpoint`]. A missing file
    /// is an empty store.
    pub async fn restore(path: &Path) -> Result<Self, StoreError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => return Err(io_error(path, source)),
        };
        let records: Vec<PageRecord> =
            serde_json::from_slice(&content).map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })?;

        let store = Self::from_records(records);
        info!("Restored {} record(s) from {}", store.len(), path.display());
        Ok(store)
    }

    /// Like [`RecordStore::restore`], but refuses a non-empty checkpoint that
    /// has no record for `base_url` (normalized), i.e. one left by a crawl of
    /// another site.
    pub async fn restore_for(path: &Path, base_url: &str) -> Result<Self, StoreError> {
        let store = Self::restore(path).await?;
        if store.is_empty() || store.lock().urls.contains(base_url) {
            return Ok(store);
        }
        Err(StoreError::ForeignCheckpoint {
            path: path.display().to_string(),
            base_url: base_url.to_string(),
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
