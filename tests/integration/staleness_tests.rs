//! Staleness detection tests.
//!
//! Tests verify:
//! - A source newer than its cache entry forces regeneration
//! - Disabling the mtime comparison serves the old entry forever
//! - A deleted source does not invalidate an existing entry

use std::time::{Duration, SystemTime};

use imgserve::cache::CacheCoordinator;
use imgserve::transcode::ImageTranscoder;

use super::test_utils::{coordinator, test_env, write_image_source, TestEnv};

/// Backdate the entry so a subsequent source write is strictly newer.
fn age_entry(path: &std::path::Path) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(60))
        .unwrap();
}

fn rewrite_source(env: &TestEnv, rel: &str, color: [u8; 3]) {
    write_image_source(env, rel, 200, 200, color);
}

#[tokio::test]
async fn test_newer_source_regenerates_entry() {
    let env = test_env();
    write_image_source(&env, "dog.png", 200, 200, [255, 0, 0]);
    let coord = coordinator(&env);

    let first = coord.resolve("/100x100/dog.png").await.unwrap();
    assert!(!first.cache_hit);
    let bytes_first = std::fs::read(&first.cache_path).unwrap();

    age_entry(&first.cache_path);
    rewrite_source(&env, "dog.png", [0, 0, 255]);

    let second = coord.resolve("/100x100/dog.png").await.unwrap();
    assert!(!second.cache_hit);
    assert_eq!(second.cache_path, first.cache_path);

    // The entry now reflects the new source pixels
    let bytes_second = std::fs::read(&second.cache_path).unwrap();
    assert_ne!(bytes_first, bytes_second);
}

#[tokio::test]
async fn test_staleness_disabled_serves_old_entry() {
    let env = test_env();
    write_image_source(&env, "dog.png", 200, 200, [255, 0, 0]);
    let coord = CacheCoordinator::new(
        &env.source_root,
        &env.cache_root,
        ImageTranscoder::new(),
    )
    .with_check_source_mtime(false);

    let first = coord.resolve("/100x100/dog.png").await.unwrap();
    let bytes_first = std::fs::read(&first.cache_path).unwrap();

    age_entry(&first.cache_path);
    rewrite_source(&env, "dog.png", [0, 0, 255]);

    let second = coord.resolve("/100x100/dog.png").await.unwrap();
    assert!(second.cache_hit);

    let bytes_second = std::fs::read(&second.cache_path).unwrap();
    assert_eq!(bytes_first, bytes_second);
}

#[tokio::test]
async fn test_deleted_source_keeps_serving_entry() {
    let env = test_env();
    let source = write_image_source(&env, "dog.png", 200, 200, [255, 0, 0]);
    let coord = coordinator(&env);

    let first = coord.resolve("/100x100/dog.png").await.unwrap();
    assert!(!first.cache_hit);

    std::fs::remove_file(&source).unwrap();

    // The cached rendition outlives its source
    let second = coord.resolve("/100x100/dog.png").await.unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.cache_path, first.cache_path);
}
