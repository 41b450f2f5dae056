//! # Thumbnail Module
//!
//! Renders small PNG previews of images for review screens.
//!
//! A preview keeps the aspect ratio of its source; its longer side is at
//! most the configured size and small images are never upscaled. When an
//! image can't be rendered the caller leaves its thumbnail empty and the
//! consumer shows a placeholder.

use crate::core::hasher::fast_decode::FastDecoder;
use crate::core::hasher::fast_resize::FastResizer;
use crate::error::ThumbnailError;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Default length of a preview's longer side, in pixels
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 200;

/// Renders preview blobs
#[derive(Debug, Clone, Copy)]
pub struct Thumbnailer {
    size: u32,
}

impl Thumbnailer {
    /// Create a thumbnailer whose previews fit in a `size` x `size` box
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Length of a preview's longer side
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Render the image at `path` as PNG bytes
    pub fn render(&self, path: &Path) -> Result<Vec<u8>, ThumbnailError> {
        let image = FastDecoder::decode(path).map_err(|e| ThumbnailError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        self.render_image(&image, path)
    }

    fn render_image(&self, image: &DynamicImage, path: &Path) -> Result<Vec<u8>, ThumbnailError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ThumbnailError::Unreadable {
                path: path.to_path_buf(),
                reason: "image has no pixels".to_string(),
            });
        }

        let (target_width, target_height) = fit_within(width, height, self.size);
        let preview = if (target_width, target_height) == (width, height) {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            let resized = FastResizer::new()
                .resize_rgba(image, target_width, target_height)
                .map_err(|e| ThumbnailError::EncodeFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            DynamicImage::ImageRgba8(resized)
        };

        let mut bytes = Vec::new();
        preview
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| ThumbnailError::EncodeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(bytes)
    }
}

impl Default for Thumbnailer {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_SIZE)
    }
}

/// Scale `(width, height)` so the longer side is at most `size`
fn fit_within(width: u32, height: u32, size: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= size {
        return (width, height);
    }

    let scale = size as f64 / longer as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, size);
    (scaled(width), scaled(height))
}
