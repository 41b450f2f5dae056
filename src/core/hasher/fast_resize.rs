//! Fast SIMD-accelerated image resizing.
//!
//! Uses fast_image_resize crate which is 5-14x faster than image crate's resize.
//! Automatically uses AVX2/NEON SIMD when available.

use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use std::path::PathBuf;

/// Fast image resizer using SIMD acceleration
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    /// Create a new fast resizer
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Resize an image to the specified dimensions and convert to grayscale.
    ///
    /// This is the hashing hot path: resize to a tiny grid + grayscale.
    pub fn resize_to_grayscale(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, HashError> {
        // Grayscale first: one channel to resize instead of three
        let gray = image.to_luma8();
        let (src_width, src_height) = gray.dimensions();

        let pixels = self.resize_raw(
            gray.into_raw(),
            (src_width, src_height),
            (width, height),
            PixelType::U8,
            FilterType::Bilinear,
        )?;

        let result: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
            .ok_or_else(|| resize_error("Failed to create result buffer"))?;

        Ok(result)
    }

    /// Resize an image to the specified dimensions keeping colour and alpha.
    ///
    /// Used for preview thumbnails, where quality matters more than for hashing.
    pub fn resize_rgba(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, HashError> {
        let rgba = image.to_rgba8();
        let (src_width, src_height) = rgba.dimensions();

        let pixels = self.resize_raw(
            rgba.into_raw(),
            (src_width, src_height),
            (width, height),
            PixelType::U8x4,
            FilterType::Lanczos3,
        )?;

        let result: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
            .ok_or_else(|| resize_error("Failed to create result buffer"))?;

        Ok(result)
    }

    fn resize_raw(
        &mut self,
        pixels: Vec<u8>,
        (src_width, src_height): (u32, u32),
        (width, height): (u32, u32),
        pixel_type: PixelType,
        filter: FilterType,
    ) -> Result<Vec<u8>, HashError> {
        if src_width == 0 || src_height == 0 {
            return Err(resize_error("Invalid source dimensions"));
        }

        if width == 0 || height == 0 {
            return Err(resize_error("Invalid destination dimensions"));
        }

        let src_image = Image::from_vec_u8(src_width, src_height, pixels, pixel_type)
            .map_err(|e| resize_error(&format!("Failed to create source image: {}", e)))?;

        let mut dst_image = Image::new(width, height, pixel_type);

        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| resize_error(&format!("Resize failed: {}", e)))?;

        Ok(dst_image.into_vec())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

// The caller knows the path and fills it in
fn resize_error(reason: &str) -> HashError {
    HashError::DecodeError {
        path: PathBuf::new(),
        reason: reason.to_string(),
    }
}

/// Convenience function for one-off resizing
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, HashError> {
    let mut resizer = FastResizer::new();
    resizer.resize_to_grayscale(image, width, height)
}
