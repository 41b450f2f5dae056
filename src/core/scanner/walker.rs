//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, ImageFilter, SizeFilter};
use super::{Dimensions, ImageFile, ImageScanner, ScanResult};
use crate::core::pipeline::CancellationToken;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to descend into subfolders
    pub include_subfolders: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
    /// Only keep images whose dimensions fall inside these bounds
    pub size_filter: Option<SizeFilter>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_subfolders: true,
            follow_symlinks: false,
            include_hidden: false,
            extensions: None,
            size_filter: None,
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

/// Mutable state shared across all scanned roots
struct ScanState<'a> {
    seen: HashSet<PathBuf>,
    images: Vec<ImageFile>,
    errors: Vec<ScanError>,
    events: &'a EventSender,
    token: &'a CancellationToken,
}

impl ScanState<'_> {
    fn record_error(&mut self, error: ScanError) {
        let path = match &error {
            ScanError::DirectoryNotFound { path }
            | ScanError::PermissionDenied { path }
            | ScanError::ReadDirectory { path, .. } => path.clone(),
            ScanError::Cancelled => PathBuf::new(),
        };
        self.events.send(Event::Scan(ScanEvent::Error {
            path,
            message: error.to_string(),
        }));
        self.errors.push(error);
    }
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// Scan a single root folder into `state`
    fn scan_directory(&self, root: &Path, state: &mut ScanState<'_>) -> Result<(), ScanError> {
        // Absolute, symlink-free roots make overlapping folders collapse
        let root = fs::canonicalize(root).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied {
                path: root.to_path_buf(),
            },
            _ => ScanError::ReadDirectory {
                path: root.to_path_buf(),
                source: e,
            },
        })?;

        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root });
        }

        let mut walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        if !self.config.include_subfolders {
            walker = walker.max_depth(1);
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e.path()));

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            source: io::Error::new(io::ErrorKind::Other, e.to_string()),
                        }
                    };
                    state.record_error(error);
                    continue;
                }
            };

            if entry.file_type().is_dir() || !self.filter.should_include(entry.path()) {
                continue;
            }

            if state.seen.contains(entry.path()) {
                continue;
            }

            if let Some(image) = self.accept(entry.path(), state) {
                state.seen.insert(image.path.clone());
                state.images.push(image);
                state.events.send(Event::Scan(ScanEvent::Progress {
                    images_found: state.images.len(),
                }));
            }

            if state.token.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
        }

        Ok(())
    }

    /// Build the image for an accepted path, or `None` if it is filtered out
    fn accept(&self, path: &Path, state: &mut ScanState<'_>) -> Option<ImageFile> {
        let mut image = ImageFile::new(path);

        match fs::metadata(path) {
            Ok(metadata) => image.file_size = Some(metadata.len()),
            Err(e) => {
                state.record_error(ScanError::ReadDirectory {
                    path: path.to_path_buf(),
                    source: e,
                });
                return None;
            }
        }

        if let Some(size_filter) = &self.config.size_filter {
            match image::image_dimensions(path) {
                Ok((width, height)) => {
                    let dimensions = Dimensions { width, height };
                    if !size_filter.accepts(dimensions) {
                        return None;
                    }
                    image.dimensions = Some(dimensions);
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping image with unreadable dimensions");
                    return None;
                }
            }
        }

        Some(image)
    }
}

impl ImageScanner for WalkDirScanner {
    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
        token: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            paths: paths.to_vec(),
        }));

        let mut state = ScanState {
            seen: HashSet::new(),
            images: Vec::new(),
            errors: Vec::new(),
            events,
            token,
        };

        for path in paths {
            if token.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            match self.scan_directory(path, &mut state) {
                Ok(()) => {}
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) => state.record_error(e),
            }
        }

        debug!(
            images = state.images.len(),
            errors = state.errors.len(),
            "Discovery finished"
        );

        events.send(Event::Scan(ScanEvent::Completed {
            total_images: state.images.len(),
        }));

        Ok(ScanResult {
            images: state.images,
            errors: state.errors,
        })
    }
}
