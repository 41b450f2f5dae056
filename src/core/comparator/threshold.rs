//! Sensitivity threshold for duplicate matching.

use crate::core::hasher::ImageHash;
use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum Hamming distance (inclusive) at which two images still count
/// as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Sensitivity(u32);

impl Sensitivity {
    /// Create a threshold, rejecting values a 64-bit hash can never reach
    pub fn new(threshold: u32) -> Result<Self, CompareError> {
        if threshold > ImageHash::BITS {
            return Err(CompareError::InvalidThreshold { value: threshold });
        }
        Ok(Self(threshold))
    }

    /// Only identical hashes match
    pub fn exact() -> Self {
        Self(0)
    }

    /// Few false positives
    pub fn strict() -> Self {
        Self(5)
    }

    /// Balanced (default)
    pub fn balanced() -> Self {
        Self(10)
    }

    /// Catches heavier edits, more false positives
    pub fn permissive() -> Self {
        Self(15)
    }

    /// The raw distance ceiling
    pub fn threshold(&self) -> u32 {
        self.0
    }

    /// Whether a distance is close enough to be a duplicate
    pub fn is_duplicate(&self, distance: u32) -> bool {
        distance <= self.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self::balanced()
    }
}

impl TryFrom<u32> for Sensitivity {
    type Error = CompareError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Parses either a raw threshold (`"7"`) or a preset name (`"strict"`)
impl FromStr for Sensitivity {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Ok(value) = name.parse::<u32>() {
            return Self::new(value);
        }
        match name.as_str() {
            "exact" => Ok(Self::exact()),
            "strict" => Ok(Self::strict()),
            "balanced" | "default" => Ok(Self::balanced()),
            "permissive" | "loose" => Ok(Self::permissive()),
            _ => Err(CompareError::UnknownPreset {
                name: s.to_string(),
            }),
        }
    }
}

impl From<Sensitivity> for u32 {
    fn from(value: Sensitivity) -> Self {
        value.0
    }
}
