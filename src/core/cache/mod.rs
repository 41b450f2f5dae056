//! # Cache Module
//!
//! Persists perceptual hashes between runs so unchanged folders don't
//! need rehashing.
//!
//! ## Lifecycle
//! - Loaded once when a run starts; a missing or unparsable file gives
//!   an empty cache
//! - Updated in memory by the pipeline coordinator only
//! - Saved once, after hashing, and only if new hashes were added
//!
//! Entries are keyed by absolute path and are never revalidated against
//! file size or modification time.

mod file;

pub use file::{default_cache_path, CacheFile};

use crate::core::hasher::ImageHash;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory `path -> hash` mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HashCache {
    entries: HashMap<PathBuf, ImageHash>,
    dirty: bool,
}

impl HashCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: HashMap<PathBuf, ImageHash>) -> Self {
        Self {
            entries,
            dirty: false,
        }
    }

    /// Look up the hash previously computed for `path`
    pub fn get(&self, path: &Path) -> Option<ImageHash> {
        self.entries.get(path).copied()
    }

    /// Record the hash of `path`, replacing any previous value
    pub fn insert(&mut self, path: PathBuf, hash: ImageHash) {
        if self.entries.insert(path, hash) != Some(hash) {
            self.dirty = true;
        }
    }

    /// Number of cached hashes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no hashes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether entries changed since the cache was loaded or last saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ImageHash)> {
        self.entries.iter()
    }
}

impl Extend<(PathBuf, ImageHash)> for HashCache {
    fn extend<T: IntoIterator<Item = (PathBuf, ImageHash)>>(&mut self, iter: T) {
        for (path, hash) in iter {
            self.insert(path, hash);
        }
    }
}
