//! Trait definitions for perceptual hashing.

use super::fast_decode::FastDecoder;
use crate::core::scanner::Dimensions;
use crate::error::HashError;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// A 64-bit perceptual hash.
///
/// Lower Hamming distance between two hashes means more similar images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHash(u64);

impl ImageHash {
    /// Number of bits in every hash
    pub const BITS: u32 = 64;

    /// Wrap raw hash bits (for cache restoration)
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw hash bits
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Compute the Hamming distance to another hash
    ///
    /// Returns the number of bits that differ between the two hashes.
    pub fn distance(&self, other: &ImageHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Get the hash as a hexadecimal string
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Perceptual hash of an image plus the basic file metadata gathered
/// while computing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// The perceptual hash
    pub hash: ImageHash,
    /// Pixel dimensions of the decoded image
    pub dimensions: Dimensions,
    /// Bytes on disk, absent if the metadata could not be read
    pub file_size: Option<u64>,
}

/// Trait for hash algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Compute a hash from an already-loaded image
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHash, HashError>;

    /// Compute a fingerprint directly from a file path.
    ///
    /// Fails with a [`HashError`] when the file cannot be opened or decoded.
    fn hash_file(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let image = FastDecoder::decode(path)?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(HashError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        let hash = self.hash_image(&image).map_err(|e| match e {
            // Resize helpers don't know which file they were working on
            HashError::DecodeError { reason, .. } => HashError::DecodeError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        Ok(Fingerprint {
            hash,
            dimensions: Dimensions { width, height },
            file_size: fs::metadata(path).map(|m| m.len()).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let hash = ImageHash::from_bits(0xFF00_AA55_0F0F_F0F0);
        assert_eq!(hash.distance(&hash), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let hash_a = ImageHash::from_bits(0xFF00);
        let hash_b = ImageHash::from_bits(0x00FF);

        assert_eq!(hash_a.distance(&hash_b), hash_b.distance(&hash_a));
    }

    #[test]
    fn distance_counts_differing_bits() {
        let hash_a = ImageHash::from_bits(0b1111_1111);
        let hash_b = ImageHash::from_bits(0);

        assert_eq!(hash_a.distance(&hash_b), 8);
        assert_eq!(ImageHash::from_bits(u64::MAX).distance(&hash_b), 64);
    }

    #[test]
    fn to_hex_is_zero_padded() {
        assert_eq!(ImageHash::from_bits(0xDEAD_BEEF).to_hex(), "00000000deadbeef");
    }

    #[test]
    fn hash_serializes_as_plain_integer() {
        let json = serde_json::to_string(&ImageHash::from_bits(42)).unwrap();
        assert_eq!(json, "42");
    }
}
