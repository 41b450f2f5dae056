//! JSON file persistence for the hash cache.

use super::HashCache;
use crate::core::hasher::ImageHash;
use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Version of the on-disk format. Files with another version are
/// treated as corrupt and start an empty cache.
const CACHE_VERSION: u32 = 1;

/// On-disk document layout
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    /// Sorted so saved files diff cleanly
    entries: BTreeMap<String, u64>,
    /// Paths that are not valid UTF-8, keyed by the hex of their raw bytes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    raw_entries: BTreeMap<String, u64>,
}

#[cfg(unix)]
fn encode_raw(path: &Path) -> Option<String> {
    use std::os::unix::ffi::OsStrExt;

    Some(
        path.as_os_str()
            .as_bytes()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect(),
    )
}

#[cfg(not(unix))]
fn encode_raw(_path: &Path) -> Option<String> {
    None
}

#[cfg(unix)]
fn decode_raw(hex: &str) -> Option<PathBuf> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect::<Option<Vec<u8>>>()?;
    Some(PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn decode_raw(_hex: &str) -> Option<PathBuf> {
    None
}

/// A cache file on disk
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Refer to the cache file at `path` (it need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache.
    ///
    /// A missing, empty or unparsable file yields an empty cache. Any other
    /// I/O failure (permissions, the path being a directory, ...) is
    /// returned as an error.
    pub fn load(&self) -> Result<HashCache, CacheError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file yet, starting empty");
                return Ok(HashCache::new());
            }
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        match Self::parse(&content) {
            Some(cache) => {
                debug!(path = %self.path.display(), entries = cache.len(), "Loaded hash cache");
                Ok(cache)
            }
            None => {
                let error = CacheError::Corrupted {
                    path: self.path.clone(),
                };
                warn!(error = %error, "Ignoring unreadable hash cache");
                Ok(HashCache::new())
            }
        }
    }

    fn parse(content: &[u8]) -> Option<HashCache> {
        let document: CacheDocument = serde_json::from_slice(content).ok()?;
        if document.version != CACHE_VERSION {
            return None;
        }

        let raw = document.raw_entries.into_iter().filter_map(|(hex, bits)| {
            let path = decode_raw(&hex);
            if path.is_none() {
                debug!(key = %hex, "Skipping undecodable raw cache key");
            }
            path.map(|path| (path, bits))
        });

        let entries: HashMap<PathBuf, ImageHash> = document
            .entries
            .into_iter()
            .map(|(path, bits)| (PathBuf::from(path), bits))
            .chain(raw)
            .map(|(path, bits)| (path, ImageHash::from_bits(bits)))
            .collect();

        Some(HashCache::from_entries(entries))
    }

    /// Write the cache, replacing the file atomically.
    ///
    /// The parent directory is created if needed. Marks the cache clean
    /// on success.
    pub fn save(&self, cache: &mut HashCache) -> Result<(), CacheError> {
        let mut document = CacheDocument {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
            raw_entries: BTreeMap::new(),
        };
        for (path, hash) in cache.iter() {
            if let Some(text) = path.to_str() {
                document.entries.insert(text.to_string(), hash.bits());
            } else if let Some(hex) = encode_raw(path) {
                document.raw_entries.insert(hex, hash.bits());
            } else {
                warn!(path = %path.display(), "Cannot persist non-Unicode path, it will be rehashed");
            }
        }

        let json = serde_json::to_vec(&document)
            .map_err(|e| CacheError::SerializationFailed(e.to_string()))?;

        let io_error = |source: io::Error| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(io_error)?;

        // Write next to the target so the rename never crosses filesystems
        let mut temp = NamedTempFile::new_in(&parent).map_err(io_error)?;
        temp.write_all(&json).map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&self.path).map_err(|e| io_error(e.error))?;

        debug!(path = %self.path.display(), entries = cache.len(), "Saved hash cache");
        cache.mark_clean();
        Ok(())
    }
}

/// Default cache location in the user's cache directory
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doppelganger")
        .join("hashes.json")
}
