//! End-to-end resolution tests with the real transcoder.
//!
//! Tests verify:
//! - Cache entry creation, naming, and subdirectory mirroring
//! - Aspect-preserving fit inside the requested box
//! - Hit behavior and byte-identical repeated output
//! - Format selection by extension and by content sniffing
//! - Error cases leaving the cache tree untouched

use std::sync::Arc;

use imgserve::cache::CacheCoordinator;
use imgserve::error::ResolveError;
use imgserve::format::ImageFormat;
use imgserve::transcode::ImageTranscoder;

use super::test_utils::{
    coordinator, decoded_file_dimensions, is_valid_jpeg, is_valid_png, test_env,
    write_image_source, write_png_bytes_source,
};

// =============================================================================
// Basic Resolution
// =============================================================================

#[tokio::test]
async fn test_resize_creates_cache_entry() {
    let env = test_env();
    write_image_source(&env, "photos/dog.jpg", 400, 300, [200, 60, 60]);
    let coord = coordinator(&env);

    let res = coord.resolve("/200x100/photos/dog.jpg").await.unwrap();

    assert!(!res.cache_hit);
    assert_eq!(res.format, ImageFormat::Jpeg);
    assert_eq!(res.cache_path, env.cache_root.join("200x100_photos/dog.jpg"));
    assert!(res.cache_path.is_file());

    let data = std::fs::read(&res.cache_path).unwrap();
    assert!(is_valid_jpeg(&data));

    // 400x300 into a 200x100 box scales by 1/3: height pins at 100
    let (w, h) = decoded_file_dimensions(&res.cache_path);
    assert_eq!(h, 100);
    assert!((132..=134).contains(&w), "unexpected width {w}");
}

#[tokio::test]
async fn test_second_resolve_is_hit_and_byte_identical() {
    let env = test_env();
    write_image_source(&env, "dog.png", 100, 100, [10, 200, 10]);
    let coord = coordinator(&env);

    let first = coord.resolve("/50x50/dog.png").await.unwrap();
    assert!(!first.cache_hit);
    let bytes_first = std::fs::read(&first.cache_path).unwrap();

    let second = coord.resolve("/50x50/dog.png").await.unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.cache_path, first.cache_path);

    let bytes_second = std::fs::read(&second.cache_path).unwrap();
    assert_eq!(bytes_first, bytes_second);
}

#[tokio::test]
async fn test_distinct_geometries_are_distinct_entries() {
    let env = test_env();
    write_image_source(&env, "dog.png", 300, 300, [10, 10, 200]);
    let coord = coordinator(&env);

    let small = coord.resolve("/50x50/dog.png").await.unwrap();
    let large = coord.resolve("/150x150/dog.png").await.unwrap();

    assert_ne!(small.cache_path, large.cache_path);
    assert_eq!(decoded_file_dimensions(&small.cache_path), (50, 50));
    assert_eq!(decoded_file_dimensions(&large.cache_path), (150, 150));
}

// =============================================================================
// Format Selection
// =============================================================================

#[tokio::test]
async fn test_png_output_for_png_extension() {
    let env = test_env();
    write_image_source(&env, "logo.png", 64, 64, [255, 255, 255]);
    let coord = coordinator(&env);

    let res = coord.resolve("/32x32/logo.png").await.unwrap();
    assert_eq!(res.format, ImageFormat::Png);

    let data = std::fs::read(&res.cache_path).unwrap();
    assert!(is_valid_png(&data));
}

#[tokio::test]
async fn test_unknown_extension_sniffs_content() {
    let env = test_env();
    // PNG bytes behind an extension the format table does not know
    write_png_bytes_source(&env, "scan.img", 64, 64);
    let coord = coordinator(&env);

    let res = coord.resolve("/32x32/scan.img").await.unwrap();
    assert_eq!(res.format, ImageFormat::Png);

    let data = std::fs::read(&res.cache_path).unwrap();
    assert!(is_valid_png(&data));
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_missing_source_leaves_cache_untouched() {
    let env = test_env();
    let coord = coordinator(&env);

    let err = coord.resolve("/100x100/photos/ghost.jpg").await.unwrap_err();
    assert!(matches!(err, ResolveError::SourceNotFound { .. }));

    assert!(!env.cache_root.join("100x100_photos").exists());
    let entries: Vec<_> = std::fs::read_dir(&env.cache_root).unwrap().collect();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_undecodable_source_is_transcode_failure() {
    let env = test_env();
    let path = env.source_root.join("broken.jpg");
    std::fs::write(&path, b"\xFF\xD8\xFF\xE0 truncated nonsense").unwrap();
    let coord = coordinator(&env);

    let err = coord.resolve("/100x100/broken.jpg").await.unwrap_err();
    assert!(matches!(err, ResolveError::TranscodeFailed { .. }));

    // The failed attempt published nothing
    assert!(!env.cache_root.join("100x100_broken.jpg").exists());
}

#[tokio::test]
async fn test_traversal_is_rejected_before_filesystem_access() {
    let env = test_env();
    write_image_source(&env, "dog.jpg", 50, 50, [0, 0, 0]);
    let coord = coordinator(&env);

    let err = coord.resolve("/100x100/../dog.jpg").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidRequest(_)));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_same_key_produces_one_entry() {
    let env = test_env();
    write_image_source(&env, "dog.png", 200, 200, [120, 120, 120]);
    let coord = Arc::new(CacheCoordinator::new(
        &env.source_root,
        &env.cache_root,
        ImageTranscoder::new(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coord = Arc::clone(&coord);
        handles.push(tokio::spawn(
            async move { coord.resolve("/100x100/dog.png").await },
        ));
    }

    for handle in handles {
        let res = handle.await.unwrap().unwrap();
        assert_eq!(res.cache_path, env.cache_root.join("100x100_dog.png"));
    }

    // A single fully-formed entry and no staging leftovers
    let names: Vec<String> = std::fs::read_dir(&env.cache_root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["100x100_dog.png".to_string()]);
    assert_eq!(
        decoded_file_dimensions(&env.cache_root.join("100x100_dog.png")),
        (100, 100)
    );
}
