//! # Core Module
//!
//! The GUI-agnostic duplicate detection engine.
//!
//! ## Modules
//! - `scanner` - Discovers images in folders
//! - `hasher` - Computes perceptual hashes
//! - `cache` - Persists hashes to avoid recomputation
//! - `comparator` - Groups images by closest match and orders groups
//! - `thumbnail` - Renders preview images
//! - `pipeline` - Orchestrates the full workflow

pub mod cache;
pub mod comparator;
pub mod hasher;
pub mod pipeline;
pub mod scanner;
pub mod thumbnail;

// Re-export commonly used types
pub use comparator::{ImageGroup, Sensitivity, SortKey};
pub use hasher::ImageHash;
pub use pipeline::{CancellationToken, Delivery, Pipeline, PipelineConfig, PipelineResult};
pub use scanner::{Dimensions, ImageFile};
