//! Pipeline configuration.

use crate::core::comparator::{Sensitivity, SortKey};
use crate::core::scanner::{ScanConfig, SizeFilter};
use crate::core::thumbnail::DEFAULT_THUMBNAIL_SIZE;
use crate::error::DoppelgangerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

/// How finished groups are handed to the listener
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Render thumbnails and send each group as soon as all of its
    /// thumbnails are done
    #[default]
    Streamed,
    /// Render thumbnails and send every group in one batch at the end
    Batched,
    /// Skip thumbnails and send every group in one batch
    Lazy,
}

impl Delivery {
    /// Whether this mode renders thumbnails
    pub fn renders_thumbnails(&self) -> bool {
        !matches!(self, Delivery::Lazy)
    }
}

/// Everything a run needs to know.
///
/// Missing fields take their defaults when deserialized, so a config
/// file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Folders to search
    pub folders: Vec<PathBuf>,
    /// Descend into subfolders
    pub include_subfolders: bool,
    /// Include hidden files and folders
    pub include_hidden: bool,
    /// Largest Hamming distance still counted as a duplicate
    pub sensitivity: Sensitivity,
    /// Only keep images within these dimensions
    pub size_filter: Option<SizeFilter>,
    /// Worker threads for hashing and thumbnails
    pub workers: usize,
    /// Order of images inside each group
    pub sort: SortKey,
    /// How groups are delivered
    pub delivery: Delivery,
    /// Longer side of a thumbnail, in pixels
    pub thumbnail_size: u32,
    /// Hash cache file; `None` keeps hashes in memory only
    pub cache_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            include_subfolders: true,
            include_hidden: false,
            sensitivity: Sensitivity::default(),
            size_filter: None,
            workers: default_workers(),
            sort: SortKey::default(),
            delivery: Delivery::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            cache_path: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, DoppelgangerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            DoppelgangerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            DoppelgangerError::Config(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Discovery settings derived from this config
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            include_subfolders: self.include_subfolders,
            include_hidden: self.include_hidden,
            size_filter: self.size_filter,
            ..ScanConfig::default()
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}
