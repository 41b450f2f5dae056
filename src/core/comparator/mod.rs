//! # Comparator Module
//!
//! Finds duplicates by comparing perceptual hashes.
//!
//! ## How It Works
//! 1. Every image finds its closest match by Hamming distance
//! 2. Matches within the sensitivity threshold are folded into groups
//! 3. Members of each group are ordered by a [`SortKey`]
//!
//! ## Comparison Thresholds
//! | Distance | Classification |
//! |----------|---------------|
//! | 0        | Exact match   |
//! | 1-4      | Near-exact    |
//! | 5-10     | Similar       |
//! | 11+      | Different     |

mod grouper;
mod sort;
mod threshold;

pub use grouper::ClosestMatchGrouper;
pub use sort::SortKey;
pub use threshold::Sensitivity;

use crate::core::scanner::ImageFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group of images believed to be near-duplicates of each other
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGroup {
    /// Unique identifier for this group
    pub id: Uuid,
    /// Members, representative first after grouping
    pub images: Vec<ImageFile>,
}

impl ImageGroup {
    /// Create a new group from its members
    pub fn new(images: Vec<ImageFile>) -> Self {
        Self {
            id: Uuid::new_v4(),
            images,
        }
    }

    /// The image every other member's `difference` is measured against.
    ///
    /// Only meaningful while the group is ordered by difference.
    pub fn representative(&self) -> &ImageFile {
        &self.images[0]
    }

    /// Get the number of duplicates (excluding the representative)
    pub fn duplicate_count(&self) -> usize {
        self.images.len().saturating_sub(1)
    }

    /// Number of images in the group
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
