//! # Error Module
//!
//! Error types for the duplicate image finder.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-item failures stay local** - an unreadable image is reported,
//!   never allowed to abort a run
//! - **Recovery hints** - suggest how to fix when possible

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum DoppelgangerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Processing was interrupted by the user")]
    Interrupted,
}

impl DoppelgangerError {
    /// Whether this error is a user-requested stop rather than a failure
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            DoppelgangerError::Interrupted
                | DoppelgangerError::Scan(ScanError::Cancelled)
                | DoppelgangerError::Compare(CompareError::Cancelled)
        )
    }
}

/// Errors that occur during image discovery
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors that occur while fingerprinting a single image.
///
/// Every variant means the image is unreadable; the pipeline records
/// it and moves on.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Path of the image that could not be read
    pub fn path(&self) -> &PathBuf {
        match self {
            HashError::DecodeError { path, .. }
            | HashError::EmptyImage { path }
            | HashError::IoError { path, .. } => path,
        }
    }
}

/// Errors that occur while grouping images
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Invalid sensitivity: {value} (must be 0-64)")]
    InvalidThreshold { value: u32 },

    #[error("Unknown sensitivity: {name} (use 0-64, exact, strict, balanced or permissive)")]
    UnknownPreset { name: String },

    #[error("Comparison was cancelled")]
    Cancelled,
}

/// Errors that occur with the persisted hash cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to serialize hash data: {0}")]
    SerializationFailed(String),
}

/// Errors that occur while rendering a preview
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Cannot read image {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to encode thumbnail for {path}: {reason}")]
    EncodeFailed { path: PathBuf, reason: String },
}

/// Errors raised by the worker pool itself (never by a work item)
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to start worker pool: {0}")]
    BuildFailed(String),

    #[error("A worker stopped before returning its result ({received} of {expected} received)")]
    WorkerLost { received: usize, expected: usize },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DoppelgangerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/vacation"));
    }

    #[test]
    fn hash_error_includes_path() {
        let error = HashError::DecodeError {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
        assert_eq!(error.path(), &PathBuf::from("/photos/broken.jpg"));
    }

    #[test]
    fn cache_error_suggests_recovery() {
        let error = CacheError::Corrupted {
            path: PathBuf::from("/cache/hashes.json"),
        };
        let message = error.to_string();
        assert!(message.contains("Delete this file"));
    }

    #[test]
    fn cancellation_is_not_a_failure() {
        assert!(DoppelgangerError::Interrupted.is_interrupted());
        assert!(DoppelgangerError::from(ScanError::Cancelled).is_interrupted());
        assert!(DoppelgangerError::from(CompareError::Cancelled).is_interrupted());
        assert!(!DoppelgangerError::Config("bad".to_string()).is_interrupted());
    }
}
