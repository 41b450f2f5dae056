//! Pipeline execution implementation.

use super::config::{Delivery, PipelineConfig};
use super::context::{CancellationToken, RunContext};
use super::pool::WorkerPool;
use crate::core::cache::{CacheFile, HashCache};
use crate::core::comparator::{ClosestMatchGrouper, ImageGroup, Sensitivity, SortKey};
use crate::core::hasher::{DifferenceHasher, HashAlgorithm};
use crate::core::scanner::{ImageFile, ImageScanner, SizeFilter, WalkDirScanner};
use crate::core::thumbnail::Thumbnailer;
use crate::error::DoppelgangerError;
use crate::events::{
    null_sender, CompareEvent, Event, EventSender, HashEvent, HashProgress, PipelineEvent,
    PipelineOutcome, PipelinePhase, PipelineSummary, ThumbnailEvent,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// How the run ended
    pub outcome: PipelineOutcome,
    /// Duplicate groups, in grouping order. After an interrupt, only the
    /// groups already delivered.
    pub groups: Vec<ImageGroup>,
    /// Counters for the run
    pub summary: PipelineSummary,
    /// Per-item failures (non-fatal)
    pub errors: Vec<String>,
}

impl PipelineResult {
    /// Whether the run was stopped early
    pub fn was_interrupted(&self) -> bool {
        self.outcome == PipelineOutcome::Interrupted
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    cache: Option<HashCache>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            cache: None,
        }
    }

    /// Start from a complete configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the folders to search
    pub fn folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.config.folders = folders;
        self
    }

    /// Descend into subfolders
    pub fn include_subfolders(mut self, include: bool) -> Self {
        self.config.include_subfolders = include;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// Set the comparison threshold
    pub fn sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.config.sensitivity = sensitivity;
        self
    }

    /// Only keep images within these dimensions
    pub fn size_filter(mut self, filter: SizeFilter) -> Self {
        self.config.size_filter = Some(filter);
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the order of images inside each group
    pub fn sort(mut self, sort: SortKey) -> Self {
        self.config.sort = sort;
        self
    }

    /// Set how groups are delivered
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.config.delivery = delivery;
        self
    }

    /// Set the thumbnail size
    pub fn thumbnail_size(mut self, size: u32) -> Self {
        self.config.thumbnail_size = size;
        self
    }

    /// Persist hashes to this file between runs
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = Some(path.into());
        self
    }

    /// Start from an already loaded cache (ignored when a cache path is set)
    pub fn cache(mut self, cache: HashCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            cache: self.cache.unwrap_or_default(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The duplicate detection pipeline
pub struct Pipeline {
    config: PipelineConfig,
    cache: HashCache,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Hashes known to this pipeline after the last run
    pub fn cache(&self) -> &HashCache {
        &self.cache
    }

    /// Run the pipeline without events
    pub fn run(&mut self) -> Result<PipelineResult, DoppelgangerError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(
        &mut self,
        events: &EventSender,
    ) -> Result<PipelineResult, DoppelgangerError> {
        let mut ctx = RunContext::new(events.clone(), CancellationToken::new());
        self.run_with_context(&mut ctx)
    }

    /// Run the pipeline with a caller-owned context.
    ///
    /// Cancelling the context's token stops the run at the next check
    /// point; the result then has outcome
    /// [`Interrupted`](PipelineOutcome::Interrupted). Exactly one
    /// [`PipelineEvent::Finished`] is emitted however the run ends.
    pub fn run_with_context(
        &mut self,
        ctx: &mut RunContext,
    ) -> Result<PipelineResult, DoppelgangerError> {
        let start_time = Instant::now();
        let mut summary = PipelineSummary::default();
        let mut delivered = Vec::new();

        ctx.emit(Event::Pipeline(PipelineEvent::Started));

        let run = self.execute(ctx, &mut summary, &mut delivered);

        let errors = ctx.take_errors();
        summary.error_count = errors.len();
        summary.had_errors = !errors.is_empty();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        let outcome = match run {
            Ok(()) => {
                ctx.advance_to(100.0);
                PipelineOutcome::Done
            }
            Err(e) if e.is_interrupted() => {
                info!("Run interrupted");
                PipelineOutcome::Interrupted
            }
            Err(e) => {
                error!(error = %e, "Run failed");
                ctx.emit(Event::Pipeline(PipelineEvent::Error {
                    message: e.to_string(),
                }));
                ctx.emit(Event::Pipeline(PipelineEvent::Finished {
                    outcome: PipelineOutcome::Failed,
                    summary,
                }));
                return Err(e);
            }
        };

        info!(
            images = summary.images_discovered,
            groups = summary.groups_found,
            errors = summary.error_count,
            duration_ms = summary.duration_ms,
            "Run finished"
        );
        ctx.emit(Event::Pipeline(PipelineEvent::Finished {
            outcome,
            summary: summary.clone(),
        }));

        Ok(PipelineResult {
            outcome,
            groups: delivered,
            summary,
            errors,
        })
    }

    fn execute(
        &mut self,
        ctx: &mut RunContext,
        summary: &mut PipelineSummary,
        delivered: &mut Vec<ImageGroup>,
    ) -> Result<(), DoppelgangerError> {
        let mut images = self.discover(ctx)?;
        summary.images_discovered = images.len();
        if images.is_empty() {
            return Ok(());
        }

        let pending = self.lookup_cache(ctx, &mut images)?;
        summary.images_cached = images.len() - pending.len();

        let pool = WorkerPool::new(self.config.workers)?;
        if !pending.is_empty() {
            summary.images_hashed = self.hash(ctx, &pool, &mut images, &pending)?;
        }

        let mut groups = self.group(ctx, images)?;
        summary.groups_found = groups.len();
        summary.duplicates_found = groups.iter().map(ImageGroup::len).sum();
        if groups.is_empty() {
            return Ok(());
        }

        ctx.enter_phase(PipelinePhase::Sorting);
        self.config.sort.sort_groups(&mut groups);
        ctx.advance_to(PipelinePhase::Sorting.end_percent());
        check_cancelled(ctx)?;

        if self.config.delivery.renders_thumbnails() {
            self.render_thumbnails(ctx, &pool, &mut groups, delivered)?;
        }
        // Streamed groups were already sent one by one
        if self.config.delivery != Delivery::Streamed {
            ctx.emit(Event::Pipeline(PipelineEvent::GroupsReady {
                groups: groups.clone(),
            }));
        }

        *delivered = groups;
        Ok(())
    }

    fn discover(&self, ctx: &mut RunContext) -> Result<Vec<ImageFile>, DoppelgangerError> {
        ctx.enter_phase(PipelinePhase::Discovering);

        let scanner = WalkDirScanner::new(self.config.scan_config());
        let result = scanner.scan_with_events(&self.config.folders, ctx.events(), ctx.token())?;

        for error in &result.errors {
            ctx.record_error(error.to_string());
        }

        debug!(images = result.images.len(), "Discovered images");
        ctx.advance_to(PipelinePhase::Discovering.end_percent());
        check_cancelled(ctx)?;
        Ok(result.images)
    }

    /// Fill in cached hashes; returns indices of images still to hash
    fn lookup_cache(
        &mut self,
        ctx: &mut RunContext,
        images: &mut [ImageFile],
    ) -> Result<Vec<usize>, DoppelgangerError> {
        ctx.enter_phase(PipelinePhase::CacheLookup);

        if let Some(path) = &self.config.cache_path {
            self.cache = CacheFile::new(path).load()?;
        }

        let mut pending = Vec::new();
        for (index, image) in images.iter_mut().enumerate() {
            match self.cache.get(&image.path) {
                Some(hash) => image.hash = Some(hash),
                None => pending.push(index),
            }
        }

        ctx.emit(Event::Hash(HashEvent::CacheChecked {
            cached: images.len() - pending.len(),
            not_cached: pending.len(),
        }));
        debug!(cached = images.len() - pending.len(), not_cached = pending.len(), "Checked cache");

        ctx.advance_to(PipelinePhase::CacheLookup.end_percent());
        check_cancelled(ctx)?;
        Ok(pending)
    }

    /// Hash the images at `pending`; returns how many succeeded
    fn hash(
        &mut self,
        ctx: &mut RunContext,
        pool: &WorkerPool,
        images: &mut [ImageFile],
        pending: &[usize],
    ) -> Result<usize, DoppelgangerError> {
        ctx.enter_phase(PipelinePhase::Hashing);

        let total = pending.len();
        ctx.emit(Event::Hash(HashEvent::Started {
            total_images: total,
        }));

        let paths: Vec<PathBuf> = pending.iter().map(|&i| images[i].path.clone()).collect();
        let hasher = DifferenceHasher::new();
        let mut dispatch = pool.dispatch(paths, ctx.token(), move |path: PathBuf| {
            hasher.hash_file(&path)
        });

        let step = phase_span(PipelinePhase::Hashing) / total as f64;
        let mut hashed = 0;
        let mut failed = 0;

        while let Some((slot, result)) = dispatch.next() {
            let image = &mut images[pending[slot]];
            match result {
                Ok(fingerprint) => {
                    image.apply_fingerprint(&fingerprint);
                    self.cache.insert(image.path.clone(), fingerprint.hash);
                    hashed += 1;
                }
                Err(e) => {
                    image.hash = None;
                    failed += 1;
                    ctx.emit(Event::Hash(HashEvent::Error {
                        path: image.path.clone(),
                        message: e.to_string(),
                    }));
                    ctx.record_error(e.to_string());
                }
            }

            ctx.emit(Event::Hash(HashEvent::Progress(HashProgress {
                completed: dispatch.received(),
                total,
                remaining: dispatch.remaining(),
                current_path: image.path.clone(),
            })));
            ctx.advance_by(step);

            if ctx.is_cancelled() {
                return Err(DoppelgangerError::Interrupted);
            }
        }
        dispatch.ensure_complete(ctx.token())?;
        check_cancelled(ctx)?;

        ctx.emit(Event::Hash(HashEvent::Completed { hashed, failed }));
        debug!(hashed, failed, "Hashing finished");

        if let Some(path) = &self.config.cache_path {
            if self.cache.is_dirty() {
                CacheFile::new(path).save(&mut self.cache)?;
            }
        }

        Ok(hashed)
    }

    fn group(
        &self,
        ctx: &mut RunContext,
        images: Vec<ImageFile>,
    ) -> Result<Vec<ImageGroup>, DoppelgangerError> {
        ctx.enter_phase(PipelinePhase::Grouping);

        let hashed = images.iter().filter(|i| i.hash.is_some()).count();
        ctx.emit(Event::Compare(CompareEvent::Started {
            total_images: hashed,
        }));

        let events = ctx.events().clone();
        let grouper = ClosestMatchGrouper::new(self.config.sensitivity);
        let groups = grouper.group_with_cancel(images, ctx.token(), |duplicates_found| {
            events.send(Event::Compare(CompareEvent::Progress { duplicates_found }));
        })?;

        let duplicates_found = groups.iter().map(ImageGroup::len).sum();
        ctx.emit(Event::Compare(CompareEvent::Completed {
            groups_found: groups.len(),
            duplicates_found,
        }));
        debug!(groups = groups.len(), duplicates_found, "Grouping finished");

        Ok(groups)
    }

    /// Render every thumbnail and put it back in its (group, image) slot.
    ///
    /// In streamed mode each group is sent, and appended to `delivered`,
    /// as soon as its last thumbnail is done.
    fn render_thumbnails(
        &self,
        ctx: &mut RunContext,
        pool: &WorkerPool,
        groups: &mut [ImageGroup],
        delivered: &mut Vec<ImageGroup>,
    ) -> Result<(), DoppelgangerError> {
        ctx.enter_phase(PipelinePhase::Thumbnailing);

        let mut slots = Vec::new();
        let mut paths = Vec::new();
        for (g, group) in groups.iter().enumerate() {
            for (i, image) in group.images.iter().enumerate() {
                slots.push((g, i));
                paths.push(image.path.clone());
            }
        }

        let total = paths.len();
        ctx.emit(Event::Thumbnail(ThumbnailEvent::Started {
            total_images: total,
        }));

        let mut remaining: Vec<usize> = groups.iter().map(ImageGroup::len).collect();
        let thumbnailer = Thumbnailer::new(self.config.thumbnail_size);
        let mut dispatch = pool.dispatch(paths, ctx.token(), move |path: PathBuf| {
            thumbnailer.render(&path)
        });
        let step = phase_span(PipelinePhase::Thumbnailing) / total as f64;

        while let Some((slot, result)) = dispatch.next() {
            let (g, i) = slots[slot];
            let image = &mut groups[g].images[i];
            match result {
                Ok(bytes) => image.thumbnail = Some(bytes),
                Err(e) => {
                    image.thumbnail = None;
                    ctx.emit(Event::Thumbnail(ThumbnailEvent::Error {
                        path: image.path.clone(),
                        message: e.to_string(),
                    }));
                    ctx.record_error(e.to_string());
                }
            }

            ctx.emit(Event::Thumbnail(ThumbnailEvent::Progress {
                completed: dispatch.received(),
                total,
            }));
            ctx.advance_by(step);

            remaining[g] -= 1;
            if remaining[g] == 0 && self.config.delivery == Delivery::Streamed {
                let group = groups[g].clone();
                delivered.push(group.clone());
                ctx.emit(Event::Pipeline(PipelineEvent::GroupsReady {
                    groups: vec![group],
                }));
            }

            if ctx.is_cancelled() {
                return Err(DoppelgangerError::Interrupted);
            }
        }
        dispatch.ensure_complete(ctx.token())?;
        check_cancelled(ctx)
    }
}

fn check_cancelled(ctx: &RunContext) -> Result<(), DoppelgangerError> {
    if ctx.is_cancelled() {
        return Err(DoppelgangerError::Interrupted);
    }
    Ok(())
}

/// Percentage points a phase covers
fn phase_span(phase: PipelinePhase) -> f64 {
    phase.end_percent() - phase.start_percent()
}
