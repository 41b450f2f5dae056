//! Event type definitions for progress reporting.

use crate::core::comparator::ImageGroup;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the duplicate finder pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Discovery phase events
    Scan(ScanEvent),
    /// Cache lookup and hashing phase events
    Hash(HashEvent),
    /// Grouping phase events
    Compare(CompareEvent),
    /// Thumbnail phase events
    Thumbnail(ThumbnailEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the discovery phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Discovery has started
    Started { paths: Vec<PathBuf> },
    /// Cumulative number of accepted images so far
    Progress { images_found: usize },
    /// An error occurred but discovery continues
    Error { path: PathBuf, message: String },
    /// Discovery completed
    Completed { total_images: usize },
}

/// Events during cache lookup and hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Discovered images were split into cached and not-cached
    CacheChecked { cached: usize, not_cached: usize },
    /// Hashing of the not-cached images has started
    Started { total_images: usize },
    /// Progress update during hashing
    Progress(HashProgress),
    /// An image could not be hashed; it is skipped
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed { hashed: usize, failed: usize },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of images hashed so far (including failures)
    pub completed: usize,
    /// Total number of images to hash
    pub total: usize,
    /// Images still waiting for a result
    pub remaining: usize,
    /// The image that just finished
    pub current_path: PathBuf,
}

/// Events during the grouping phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// Grouping has started
    Started { total_images: usize },
    /// Images placed in a group so far
    Progress { duplicates_found: usize },
    /// Grouping completed
    Completed {
        groups_found: usize,
        duplicates_found: usize,
    },
}

/// Events during thumbnail generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ThumbnailEvent {
    /// Thumbnail generation has started
    Started { total_images: usize },
    /// Number of thumbnails finished so far
    Progress { completed: usize, total: usize },
    /// A thumbnail could not be rendered; the consumer shows a placeholder
    Error { path: PathBuf, message: String },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Overall progress in percent (0-100), never decreasing within a run
    Progress { percent: f64 },
    /// One or more duplicate groups are ready for display
    GroupsReady { groups: Vec<ImageGroup> },
    /// A user-visible error message
    Error { message: String },
    /// The run ended. Emitted exactly once per run.
    Finished {
        outcome: PipelineOutcome,
        summary: PipelineSummary,
    },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Discovering,
    CacheLookup,
    Hashing,
    Grouping,
    Sorting,
    Thumbnailing,
}

impl PipelinePhase {
    /// Overall progress percentage at which this phase starts
    pub fn start_percent(&self) -> f64 {
        match self {
            PipelinePhase::Discovering => 0.0,
            PipelinePhase::CacheLookup => 5.0,
            PipelinePhase::Hashing => 15.0,
            PipelinePhase::Grouping | PipelinePhase::Sorting => 55.0,
            PipelinePhase::Thumbnailing => 65.0,
        }
    }

    /// Overall progress percentage at which this phase ends
    pub fn end_percent(&self) -> f64 {
        match self {
            PipelinePhase::Discovering => 5.0,
            PipelinePhase::CacheLookup => 15.0,
            PipelinePhase::Hashing => 55.0,
            PipelinePhase::Grouping | PipelinePhase::Sorting => 65.0,
            PipelinePhase::Thumbnailing => 100.0,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineOutcome {
    /// All phases completed
    Done,
    /// Stopped early at the user's request
    Interrupted,
    /// Aborted by an unexpected error
    Failed,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Images accepted by discovery
    pub images_discovered: usize,
    /// Images whose hash came from the cache
    pub images_cached: usize,
    /// Images hashed during this run
    pub images_hashed: usize,
    /// Number of duplicate groups
    pub groups_found: usize,
    /// Number of images placed in a group
    pub duplicates_found: usize,
    /// Number of per-item failures
    pub error_count: usize,
    /// Whether any per-item failure occurred
    pub had_errors: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Discovering => write!(f, "Discovering"),
            PipelinePhase::CacheLookup => write!(f, "Checking cache"),
            PipelinePhase::Hashing => write!(f, "Hashing"),
            PipelinePhase::Grouping => write!(f, "Grouping"),
            PipelinePhase::Sorting => write!(f, "Sorting"),
            PipelinePhase::Thumbnailing => write!(f, "Making thumbnails"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Hash(HashEvent::Progress(HashProgress {
            completed: 10,
            total: 50,
            remaining: 40,
            current_path: PathBuf::from("/photos/a.png"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Hash(HashEvent::Progress(p)) => {
                assert_eq!(p.remaining, 40);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn phase_weights_are_contiguous() {
        let phases = [
            PipelinePhase::Discovering,
            PipelinePhase::CacheLookup,
            PipelinePhase::Hashing,
            PipelinePhase::Grouping,
            PipelinePhase::Thumbnailing,
        ];

        for pair in phases.windows(2) {
            assert_eq!(pair[0].end_percent(), pair[1].start_percent());
        }
        assert_eq!(PipelinePhase::Thumbnailing.end_percent(), 100.0);
    }

    #[test]
    fn finished_event_carries_outcome() {
        let event = Event::Pipeline(PipelineEvent::Finished {
            outcome: PipelineOutcome::Interrupted,
            summary: PipelineSummary::default(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Interrupted"));
    }
}
