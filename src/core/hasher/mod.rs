//! # Hasher Module
//!
//! Computes perceptual fingerprints for images.
//!
//! ## How It Works
//! 1. Decode the image (`zune-jpeg` for JPEGs, `image` for the rest)
//! 2. Resize to a 9x8 grayscale grid with `fast_image_resize`
//! 3. Compare horizontally adjacent pixels into a 64-bit dHash
//! 4. Compare hashes using Hamming distance
//!
//! A hasher is a pure function of the file, so the pipeline can run it
//! on any worker thread.
//!
//! ## Example
//! ```rust,ignore
//! use doppelganger::core::hasher::{DifferenceHasher, HashAlgorithm};
//!
//! let fingerprint = DifferenceHasher::new().hash_file(&path)?;
//! println!("{} ({}x{})", fingerprint.hash, fingerprint.dimensions.width, fingerprint.dimensions.height);
//! ```

mod difference;
pub mod fast_decode;
pub mod fast_resize;
mod traits;

pub use difference::DifferenceHasher;
pub use traits::{Fingerprint, HashAlgorithm, ImageHash};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HashError;
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn hash_file_fills_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stripes.png");
        RgbImage::from_fn(64, 48, |x, _| if x % 16 < 8 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) })
            .save(&path)
            .unwrap();

        let fingerprint = DifferenceHasher::new().hash_file(&path).unwrap();

        assert_eq!(fingerprint.dimensions.width, 64);
        assert_eq!(fingerprint.dimensions.height, 48);
        assert_eq!(
            fingerprint.file_size,
            Some(std::fs::metadata(&path).unwrap().len())
        );
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"garbage").unwrap();

        let error = DifferenceHasher::new().hash_file(&path).unwrap_err();

        assert_eq!(error.path(), &path);
        assert!(matches!(error, HashError::DecodeError { .. } | HashError::IoError { .. }));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let result = DifferenceHasher::new().hash_file(Path::new("/nonexistent/x.png"));
        assert!(result.is_err());
    }
}
