//! # Pipeline Module
//!
//! Orchestrates the full duplicate detection workflow.
//!
//! ## Pipeline Stages
//! 1. **Discover** - Find all images in the given folders
//! 2. **Cache lookup** - Reuse hashes from earlier runs
//! 3. **Hash** - Fingerprint the remaining images in parallel
//! 4. **Group** - Fold closest matches into duplicate groups
//! 5. **Sort** - Order the members of every group
//! 6. **Thumbnail** - Render previews in parallel and deliver groups
//!
//! ## Progress
//! Overall progress moves through fixed phase weights: discovery 0-5%,
//! cache lookup 5-15%, hashing 15-55%, grouping and sorting 55-65%,
//! thumbnails 65-100%.
//!
//! ## Parallelism
//! Hashing and thumbnails run on a bounded rayon pool. The coordinating
//! thread owns the cache and all run state, so workers share nothing but
//! the cancellation token.

mod config;
mod context;
mod executor;
mod pool;

pub use config::{Delivery, PipelineConfig};
pub use context::{CancellationToken, RunContext};
pub use executor::{Pipeline, PipelineBuilder, PipelineResult};
pub use pool::{Dispatch, WorkerPool};
