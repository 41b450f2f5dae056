//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end pipeline behavior including:
//! - Empty and missing folders
//! - Unreadable images
//! - Progress reporting and group delivery
//! - Cancellation

use doppelganger::core::comparator::{Sensitivity, SortKey};
use doppelganger::core::pipeline::{CancellationToken, Delivery, Pipeline, RunContext};
use doppelganger::core::scanner::SizeFilter;
use doppelganger::events::{Event, EventChannel, HashEvent, PipelineEvent, PipelineOutcome};
use image::{GenericImageView, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

/// Horizontal gradient of any size; all descending gradients share a hash
fn create_gradient(path: &Path, width: u32, height: u32, descending: bool) {
    RgbImage::from_fn(width, height, |x, _| {
        let step = (x * 190 / width) as u8;
        let value = if descending { 240 - step } else { 20 + step };
        Rgb([value, value, value])
    })
    .save(path)
    .unwrap();
}

/// Vertical gradient; flat rows hash to zero
fn create_vertical(path: &Path) {
    RgbImage::from_fn(64, 64, |_, y| {
        let value = 20 + (y * 190 / 64) as u8;
        Rgb([value, value, value])
    })
    .save(path)
    .unwrap();
}

fn run_collecting(pipeline: &mut Pipeline) -> (PipelineOutcome, Vec<Event>) {
    let (sender, receiver) = EventChannel::new();
    let result = pipeline.run_with_events(&sender).unwrap();
    drop(sender);
    (result.outcome, receiver.iter().collect())
}

fn finished_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Pipeline(PipelineEvent::Finished { .. })))
        .count()
}

#[test]
fn pipeline_handles_empty_directory() {
    let temp_dir = TempDir::new().unwrap();

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .build();

    let result = pipeline.run().unwrap();

    assert_eq!(result.outcome, PipelineOutcome::Done);
    assert_eq!(result.summary.images_discovered, 0);
    assert!(result.groups.is_empty());
    assert!(!result.summary.had_errors);
}

#[test]
fn pipeline_handles_nonexistent_path() {
    let mut pipeline = Pipeline::builder()
        .folders(vec![PathBuf::from("/nonexistent/path/that/does/not/exist")])
        .build();

    // A missing folder is reported, not fatal
    let result = pipeline.run().unwrap();

    assert_eq!(result.outcome, PipelineOutcome::Done);
    assert_eq!(result.summary.images_discovered, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.summary.had_errors);
}

#[test]
fn one_corrupt_image_does_not_stop_the_run() {
    let temp_dir = TempDir::new().unwrap();
    create_gradient(&temp_dir.path().join("a.png"), 64, 64, true);
    create_gradient(&temp_dir.path().join("b.png"), 80, 60, true);
    create_vertical(&temp_dir.path().join("c.png"));
    fs::write(temp_dir.path().join("corrupt.jpg"), b"this is not a valid image file").unwrap();

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .sensitivity(Sensitivity::new(4).unwrap())
        .build();

    let result = pipeline.run().unwrap();

    assert_eq!(result.outcome, PipelineOutcome::Done);
    assert_eq!(result.summary.images_discovered, 4);
    assert_eq!(result.summary.images_hashed, 3);
    assert_eq!(result.summary.error_count, 1);
    assert!(result.errors[0].contains("corrupt.jpg"));
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 2);
    // The unreadable file is never cached
    assert_eq!(pipeline.cache().len(), 3);
}

#[test]
fn progress_is_monotone_and_ends_at_100() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..6 {
        create_gradient(&temp_dir.path().join(format!("g{}.png", i)), 40 + i * 8, 40, true);
    }
    create_vertical(&temp_dir.path().join("other.png"));

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .workers(3)
        .thumbnail_size(32)
        .build();

    let (outcome, events) = run_collecting(&mut pipeline);

    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Pipeline(PipelineEvent::Progress { percent }) => Some(*percent),
            _ => None,
        })
        .collect();

    assert_eq!(outcome, PipelineOutcome::Done);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
    assert_eq!(progress.last().copied(), Some(100.0));
    assert_eq!(finished_count(&events), 1);
}

#[test]
fn streamed_groups_carry_their_own_thumbnails() {
    let temp_dir = TempDir::new().unwrap();
    // Same picture at different sizes; thumbnails keep the source size
    let sizes = [(60, 40), (30, 20), (45, 30)];
    for (i, (w, h)) in sizes.iter().enumerate() {
        create_gradient(&temp_dir.path().join(format!("h{}.png", i)), *w, *h, true);
    }
    create_gradient(&temp_dir.path().join("up1.png"), 50, 50, false);
    create_gradient(&temp_dir.path().join("up2.png"), 20, 20, false);

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .delivery(Delivery::Streamed)
        .thumbnail_size(200)
        .build();

    let (sender, receiver) = EventChannel::new();
    let result = pipeline.run_with_events(&sender).unwrap();
    drop(sender);

    let batches: Vec<_> = receiver
        .iter()
        .filter_map(|e| match e {
            Event::Pipeline(PipelineEvent::GroupsReady { groups }) => Some(groups),
            _ => None,
        })
        .collect();

    assert_eq!(result.groups.len(), 2);
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|batch| batch.len() == 1));

    for group in &result.groups {
        for image in &group.images {
            let thumbnail = image.thumbnail.as_ref().expect("thumbnail rendered");
            let preview = image::load_from_memory(thumbnail).unwrap();
            let source = image::image_dimensions(&image.path).unwrap();
            assert_eq!(preview.dimensions(), source, "{}", image.path.display());
        }
    }
}

#[test]
fn batched_delivery_sends_everything_at_once() {
    let temp_dir = TempDir::new().unwrap();
    create_gradient(&temp_dir.path().join("a.png"), 64, 64, true);
    create_gradient(&temp_dir.path().join("b.png"), 32, 32, true);
    create_gradient(&temp_dir.path().join("c.png"), 64, 64, false);
    create_gradient(&temp_dir.path().join("d.png"), 32, 32, false);

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .delivery(Delivery::Batched)
        .build();

    let (_, events) = run_collecting(&mut pipeline);

    let batches: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            Event::Pipeline(PipelineEvent::GroupsReady { groups }) => Some(groups.len()),
            _ => None,
        })
        .collect();

    assert_eq!(batches, vec![2]);
}

#[test]
fn groups_can_be_sorted_by_path() {
    let temp_dir = TempDir::new().unwrap();
    create_gradient(&temp_dir.path().join("c.png"), 64, 64, true);
    create_gradient(&temp_dir.path().join("a.png"), 48, 48, true);
    create_gradient(&temp_dir.path().join("b.png"), 32, 32, true);

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .sort(SortKey::Path)
        .delivery(Delivery::Lazy)
        .build();

    let result = pipeline.run().unwrap();

    let names: Vec<_> = result.groups[0]
        .images
        .iter()
        .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn size_filter_excludes_small_images() {
    let temp_dir = TempDir::new().unwrap();
    create_gradient(&temp_dir.path().join("big1.png"), 120, 100, true);
    create_gradient(&temp_dir.path().join("big2.png"), 110, 100, true);
    create_gradient(&temp_dir.path().join("small.png"), 20, 20, true);

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .size_filter(SizeFilter {
            min_width: 100,
            ..Default::default()
        })
        .delivery(Delivery::Lazy)
        .build();

    let result = pipeline.run().unwrap();

    assert_eq!(result.summary.images_discovered, 2);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 2);
}

#[test]
fn cancelling_during_hashing_interrupts_the_run() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..8 {
        create_gradient(&temp_dir.path().join(format!("g{}.png", i)), 64, 64, true);
    }
    let cache_path = temp_dir.path().join("cache").join("hashes.json");

    // Rendezvous channel: every send waits for the listener
    let (sender, receiver) = EventChannel::bounded(0);
    let token = CancellationToken::new();
    let listener_token = token.clone();

    let listener = thread::spawn(move || {
        let mut events = Vec::new();
        for event in receiver.iter() {
            if matches!(event, Event::Hash(HashEvent::Progress(_))) {
                listener_token.cancel();
            }
            events.push(event);
        }
        events
    });

    let mut pipeline = Pipeline::builder()
        .folders(vec![temp_dir.path().to_path_buf()])
        .cache_path(&cache_path)
        .workers(1)
        .build();

    let mut ctx = RunContext::new(sender, token);
    let result = pipeline.run_with_context(&mut ctx).unwrap();
    drop(ctx);
    let events = listener.join().unwrap();

    assert_eq!(result.outcome, PipelineOutcome::Interrupted);
    assert!(result.groups.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(finished_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(Event::Pipeline(PipelineEvent::Finished {
            outcome: PipelineOutcome::Interrupted,
            ..
        }))
    ));
    // A partial batch is never persisted
    assert!(!cache_path.exists());
}
