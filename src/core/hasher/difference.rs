//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to 9 x 8
//! 2. Converting to grayscale
//! 3. Comparing each pixel to the one to its right
//! 4. If left pixel is brighter, set bit to 1, else 0
//!
//! The 64 comparisons are packed row by row into a `u64`, first
//! comparison in the most significant bit.

use super::fast_resize::resize_to_grayscale;
use super::traits::{HashAlgorithm, ImageHash};
use crate::error::HashError;
use image::DynamicImage;

/// Width and height of the comparison grid
const GRID: u32 = 8;

/// Difference Hash (dHash) implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferenceHasher;

impl DifferenceHasher {
    /// Create a new dHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHash, HashError> {
        // One extra column to compute differences
        let gray = resize_to_grayscale(image, GRID + 1, GRID)?;

        let mut bits: u64 = 0;
        for y in 0..GRID {
            for x in 0..GRID {
                let left_pixel = gray.get_pixel(x, y)[0];
                let right_pixel = gray.get_pixel(x + 1, y)[0];

                bits <<= 1;
                if left_pixel > right_pixel {
                    bits |= 1;
                }
            }
        }

        Ok(ImageHash::from_bits(bits))
    }
}
