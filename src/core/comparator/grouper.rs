//! Groups images by closest match.
//!
//! Every image looks for its single nearest neighbour within the
//! sensitivity threshold. Pairs are then folded into groups in one
//! left-to-right pass over a flat `image -> representative` map:
//!
//! - both already grouped: nothing happens, even if they sit in
//!   different groups
//! - one side grouped: the other joins that group
//! - neither grouped: the pair starts a new group, the scanning image
//!   being the representative
//!
//! Groups formed earlier are never merged later. That is a known
//! limitation: two images whose closest matches land in two different,
//! already formed groups are never joined, and a member may sit further
//! than the threshold from its representative.

use super::{ImageGroup, Sensitivity};
use crate::core::hasher::ImageHash;
use crate::core::pipeline::CancellationToken;
use crate::core::scanner::ImageFile;
use crate::error::CompareError;
use std::collections::HashMap;

/// Groups images around the closest match of each image
#[derive(Debug, Clone, Copy)]
pub struct ClosestMatchGrouper {
    sensitivity: Sensitivity,
}

impl ClosestMatchGrouper {
    /// Create a grouper with the given threshold
    pub fn new(sensitivity: Sensitivity) -> Self {
        Self { sensitivity }
    }

    /// Group images; images without a hash or without a match are dropped.
    pub fn group(&self, images: Vec<ImageFile>) -> Vec<ImageGroup> {
        match self.group_with_cancel(images, &CancellationToken::new(), |_| {}) {
            Ok(groups) => groups,
            Err(_) => unreachable!("a fresh token is never cancelled"),
        }
    }

    /// Group images, checking `token` once per scanned image.
    ///
    /// `on_progress` receives the number of images placed in a group so far.
    pub fn group_with_cancel(
        &self,
        images: Vec<ImageFile>,
        token: &CancellationToken,
        mut on_progress: impl FnMut(usize),
    ) -> Result<Vec<ImageGroup>, CompareError> {
        let mut images: Vec<Option<ImageFile>> = images
            .into_iter()
            .filter(|image| image.hash.is_some())
            .map(Some)
            .collect();
        let hashes: Vec<ImageHash> = images
            .iter()
            .flatten()
            .filter_map(|image| image.hash)
            .collect();

        let count = hashes.len();
        let mut representative: Vec<Option<usize>> = vec![None; count];
        let mut difference = vec![0u32; count];
        // Order in which images entered the map; fixes the group order
        let mut attached: Vec<usize> = Vec::new();

        for i in 0..count {
            if token.is_cancelled() {
                return Err(CompareError::Cancelled);
            }

            let Some(j) = self.closest_match(&hashes, i) else {
                continue;
            };

            match (representative[i], representative[j]) {
                (Some(_), Some(_)) => continue,
                (None, Some(rep)) => {
                    difference[i] = hashes[i].distance(&hashes[rep]);
                    representative[i] = Some(rep);
                    attached.push(i);
                }
                (Some(rep), None) => {
                    difference[j] = hashes[j].distance(&hashes[rep]);
                    representative[j] = Some(rep);
                    attached.push(j);
                }
                (None, None) => {
                    difference[j] = hashes[j].distance(&hashes[i]);
                    representative[j] = Some(i);
                    attached.push(j);
                    representative[i] = Some(i);
                    attached.push(i);
                }
            }

            on_progress(attached.len());
        }

        let mut slot_of_rep: HashMap<usize, usize> = HashMap::new();
        let mut buckets: Vec<Vec<ImageFile>> = Vec::new();

        for index in attached {
            let Some(rep) = representative[index] else {
                continue;
            };
            let Some(mut image) = images[index].take() else {
                continue;
            };
            image.difference = difference[index];

            let slot = *slot_of_rep.entry(rep).or_insert_with(|| {
                buckets.push(Vec::new());
                buckets.len() - 1
            });
            buckets[slot].push(image);
        }

        Ok(buckets
            .into_iter()
            .map(|mut members| {
                // Stable: equal differences keep their attach order
                members.sort_by_key(|image| image.difference);
                ImageGroup::new(members)
            })
            .collect())
    }

    /// Index of the nearest other image within the threshold.
    ///
    /// Ties go to the lowest index.
    fn closest_match(&self, hashes: &[ImageHash], i: usize) -> Option<usize> {
        let mut closest: Option<(usize, u32)> = None;

        for (j, hash) in hashes.iter().enumerate() {
            if j == i {
                continue;
            }
            let distance = hashes[i].distance(hash);
            if !self.sensitivity.is_duplicate(distance) {
                continue;
            }
            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((j, distance));
            }
        }

        closest.map(|(j, _)| j)
    }
}
