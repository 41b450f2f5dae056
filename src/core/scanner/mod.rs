//! # Scanner Module
//!
//! Discovers image files in folders.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - BMP (.bmp)
//! - GIF (.gif)
//! - WebP (.webp)
//! - TIFF (.tiff, .tif)
//!
//! ## Example
//! ```rust,ignore
//! use doppelganger::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let found = scanner.scan(&["/home/me/Pictures".into()])?;
//! ```

mod filter;
mod walker;

pub use filter::{ImageFilter, SizeFilter};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::core::hasher::{Fingerprint, ImageHash};
use crate::core::pipeline::CancellationToken;
use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Width and height of an image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Number of pixels
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One image file under consideration.
///
/// The absolute `path` is the identity of an image: it is the cache key
/// and no two images in a run share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFile {
    /// Absolute path to the image
    pub path: PathBuf,
    /// Perceptual hash; `None` until computed or if it could not be computed
    pub hash: Option<ImageHash>,
    /// Pixel dimensions; `None` until read or if they could not be read
    pub dimensions: Option<Dimensions>,
    /// Bytes on disk; `None` if the metadata could not be read
    pub file_size: Option<u64>,
    /// Encoded preview; `None` until rendered or if rendering failed
    pub thumbnail: Option<Vec<u8>>,
    /// Hamming distance to the representative of this image's group
    pub difference: u32,
}

impl ImageFile {
    /// Create an image with nothing computed yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hash: None,
            dimensions: None,
            file_size: None,
            thumbnail: None,
            difference: 0,
        }
    }

    /// Attach an already known hash
    pub fn with_hash(mut self, hash: ImageHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Merge a freshly computed fingerprint into this image
    pub fn apply_fingerprint(&mut self, fingerprint: &Fingerprint) {
        self.hash = Some(fingerprint.hash);
        self.dimensions = Some(fingerprint.dimensions);
        if fingerprint.file_size.is_some() {
            self.file_size = fingerprint.file_size;
        }
    }

    /// Dimensions, reading the image header on first use.
    pub fn load_dimensions(&mut self) -> Option<Dimensions> {
        if self.dimensions.is_none() {
            self.dimensions = image::image_dimensions(&self.path)
                .ok()
                .map(|(width, height)| Dimensions { width, height });
        }
        self.dimensions
    }

    /// File size, reading file metadata on first use.
    pub fn load_file_size(&mut self) -> Option<u64> {
        if self.file_size.is_none() {
            self.file_size = fs::metadata(&self.path).map(|m| m.len()).ok();
        }
        self.file_size
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered images, unique by path, in walk order
    pub images: Vec<ImageFile>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for image scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait ImageScanner: Send + Sync {
    /// Scan folders and return discovered images
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(paths, &crate::events::null_sender(), &CancellationToken::new())
    }

    /// Scan with progress reporting, stopping with [`ScanError::Cancelled`]
    /// once `token` is cancelled
    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
        token: &CancellationToken,
    ) -> Result<ScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn area_does_not_overflow() {
        let dims = Dimensions {
            width: u32::MAX,
            height: 2,
        };
        assert_eq!(dims.area(), u32::MAX as u64 * 2);
    }

    #[test]
    fn fingerprint_fills_missing_metadata() {
        let mut image = ImageFile::new("/photos/a.png");
        image.apply_fingerprint(&Fingerprint {
            hash: ImageHash::from_bits(7),
            dimensions: Dimensions {
                width: 3,
                height: 4,
            },
            file_size: Some(99),
        });

        assert_eq!(image.hash, Some(ImageHash::from_bits(7)));
        assert_eq!(image.dimensions.map(|d| d.area()), Some(12));
        assert_eq!(image.file_size, Some(99));
    }

    #[test]
    fn lazy_metadata_is_read_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.png");
        RgbImage::from_pixel(5, 9, Rgb([1, 2, 3])).save(&path).unwrap();

        let mut image = ImageFile::new(&path);

        assert_eq!(
            image.load_dimensions(),
            Some(Dimensions {
                width: 5,
                height: 9
            })
        );
        assert!(image.load_file_size().unwrap() > 0);
    }

    #[test]
    fn lazy_metadata_is_absent_for_missing_file() {
        let mut image = ImageFile::new("/nonexistent/gone.png");

        assert_eq!(image.load_dimensions(), None);
        assert_eq!(image.load_file_size(), None);
    }
}
