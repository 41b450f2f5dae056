//! Integration tests for hash cache persistence across runs.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use doppelganger::core::cache::{CacheFile, HashCache};
use doppelganger::core::hasher::ImageHash;
use doppelganger::core::pipeline::{Delivery, Pipeline};
use doppelganger::events::{Event, EventChannel, HashEvent};
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::path::Path;

fn create_gradient(path: &Path, width: u32) {
    RgbImage::from_fn(width, 32, |x, _| {
        let value = 240 - (x * 190 / width) as u8;
        Rgb([value, value, value])
    })
    .save(path)
    .unwrap();
}

fn lazy_pipeline(photos: &Path, cache: &Path) -> Pipeline {
    Pipeline::builder()
        .folders(vec![photos.to_path_buf()])
        .cache_path(cache)
        .delivery(Delivery::Lazy)
        .build()
}

#[test]
fn cache_file_roundtrip_is_exact() {
    let temp = TempDir::new().unwrap();
    let file = CacheFile::new(temp.child("hashes.json").path());

    let mut cache = HashCache::new();
    cache.insert("/photos/one.jpg".into(), ImageHash::from_bits(0));
    cache.insert("/photos/two.png".into(), ImageHash::from_bits(u64::MAX));
    cache.insert("/photos/three.gif".into(), ImageHash::from_bits(1 << 63));
    file.save(&mut cache).unwrap();

    temp.child("hashes.json").assert(predicate::path::is_file());
    assert_eq!(file.load().unwrap(), cache);
}

#[test]
fn second_run_reads_hashes_from_cache() {
    let temp = TempDir::new().unwrap();
    let photos = temp.child("photos");
    photos.create_dir_all().unwrap();
    create_gradient(photos.child("a.png").path(), 64);
    create_gradient(photos.child("b.png").path(), 48);
    let cache_file = temp.child("cache/hashes.json");

    let first = lazy_pipeline(photos.path(), cache_file.path()).run().unwrap();
    assert_eq!(first.summary.images_hashed, 2);
    assert_eq!(first.summary.images_cached, 0);
    cache_file.assert(predicate::path::is_file());
    cache_file.assert(predicate::str::contains("\"version\":1"));

    // A fresh pipeline only shares the file on disk
    let (sender, receiver) = EventChannel::new();
    let second = lazy_pipeline(photos.path(), cache_file.path())
        .run_with_events(&sender)
        .unwrap();
    drop(sender);

    assert_eq!(second.summary.images_cached, 2);
    assert_eq!(second.summary.images_hashed, 0);
    assert_eq!(second.groups.len(), 1);
    assert!(receiver.iter().any(|e| matches!(
        e,
        Event::Hash(HashEvent::CacheChecked {
            cached: 2,
            not_cached: 0
        })
    )));
}

#[test]
fn only_new_images_are_hashed() {
    let temp = TempDir::new().unwrap();
    let photos = temp.child("photos");
    photos.create_dir_all().unwrap();
    create_gradient(photos.child("a.png").path(), 64);
    let cache_file = temp.child("hashes.json");

    lazy_pipeline(photos.path(), cache_file.path()).run().unwrap();
    create_gradient(photos.child("b.png").path(), 40);

    let result = lazy_pipeline(photos.path(), cache_file.path()).run().unwrap();

    assert_eq!(result.summary.images_cached, 1);
    assert_eq!(result.summary.images_hashed, 1);
    assert_eq!(CacheFile::new(cache_file.path()).load().unwrap().len(), 2);
}

#[test]
fn corrupt_cache_is_replaced() {
    let temp = TempDir::new().unwrap();
    let photos = temp.child("photos");
    photos.create_dir_all().unwrap();
    create_gradient(photos.child("a.png").path(), 64);
    let cache_file = temp.child("hashes.json");
    cache_file.write_str("{\"version\": 1, \"entries\": ").unwrap();

    let result = lazy_pipeline(photos.path(), cache_file.path()).run().unwrap();

    assert!(!result.summary.had_errors);
    assert_eq!(result.summary.images_hashed, 1);
    assert_eq!(CacheFile::new(cache_file.path()).load().unwrap().len(), 1);
}
