// src/output.rs
// =============================================================================
// Files produced by a run, all under one output directory:
//
//   OUTPUT.json          the Result array
//   OUTPUT.html          the full HTML report
//   dataset.json         the persisted page records (reduced on request)
//   state/records.json   the crawl checkpoint (always full records)
//
// The dataset is the external sink only. Reducing it never affects the
// in-memory records the graph is built from.
// =============================================================================

use crate::error::StoreError;
use crate::graph::PageResult;
use crate::record::PageRecord;
use crate::report::{render_html, ReportStyles};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_FILE: &str = "OUTPUT.json";
pub const REPORT_FILE: &str = "OUTPUT.html";
pub const DATASET_FILE: &str = "dataset.json";
pub const CHECKPOINT_FILE: &str = "state/records.json";

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.path(CHECKPOINT_FILE)
    }

    /// Writes OUTPUT.json and OUTPUT.html. Returns the HTML report path.
    pub async fn save_results(
        &self,
        results: &[PageResult],
        base_url: &str,
        styles: &ReportStyles,
    ) -> Result<PathBuf, StoreError> {
        info!("Saving results...");
        self.write_json(RESULTS_FILE, results).await?;

        let html = render_html(results, base_url, false, styles);
        let report_path = self.path(REPORT_FILE);
        self.write(&report_path, html.into_bytes()).await?;

        info!("HTML report was stored to {}", report_path.display());
        Ok(report_path)
    }

    /// Writes the persisted dataset, without link and anchor lists if `reduced`.
    pub async fn save_dataset(&self, records: &[PageRecord], reduced: bool) -> Result<PathBuf, StoreError> {
        if reduced {
            let reduced: Vec<_> = records.iter().map(PageRecord::reduced).collect();
            self.write_json(DATASET_FILE, &reduced).await
        } else {
            self.write_json(DATASET_FILE, records).await
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.path(name);
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;
        self.write(&path, json).await?;
        Ok(path)
    }

    async fn write(&self, path: &Path, content: Vec<u8>) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(path, content).await.map_err(io_error)
    }
}

/// Reads page records from a dataset or checkpoint file.
pub async fn load_records(path: &Path) -> Result<Vec<PageRecord>, StoreError> {
    let content = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })
}
