//! Test utilities for integration tests.
//!
//! This module provides helper functions for building temporary source and
//! cache trees, generating real image files, and wiring up the router.

use std::path::{Path, PathBuf};

use axum::Router;
use image::{ImageBuffer, Rgb, RgbImage};
use tempfile::TempDir;

use imgserve::cache::CacheCoordinator;
use imgserve::server::{create_router, RouterConfig};
use imgserve::transcode::ImageTranscoder;

// =============================================================================
// Temporary Environment
// =============================================================================

/// Temporary source and cache trees, cleaned up on drop.
pub struct TestEnv {
    pub source_root: PathBuf,
    pub cache_root: PathBuf,
    _dir: TempDir,
}

pub fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let source_root = dir.path().join("images");
    let cache_root = dir.path().join("cache");
    std::fs::create_dir_all(&source_root).unwrap();
    std::fs::create_dir_all(&cache_root).unwrap();
    TestEnv {
        source_root,
        cache_root,
        _dir: dir,
    }
}

/// Coordinator over the environment's trees with the real transcoder.
pub fn coordinator(env: &TestEnv) -> CacheCoordinator<ImageTranscoder> {
    CacheCoordinator::new(&env.source_root, &env.cache_root, ImageTranscoder::new())
}

/// Router over the environment's trees, tracing disabled for test quiet.
pub fn router(env: &TestEnv) -> Router {
    create_router(
        coordinator(env),
        RouterConfig::new().with_tracing(false),
    )
}

// =============================================================================
// Image Generation
// =============================================================================

/// Write a solid-color image under the source tree, format chosen by the
/// file extension (.png, .jpg, .gif).
pub fn write_image_source(
    env: &TestEnv,
    rel: &str,
    width: u32,
    height: u32,
    color: [u8; 3],
) -> PathBuf {
    let path = env.source_root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb(color));
    img.save(&path).expect("failed to write source image");
    path
}

/// Write a PNG-encoded image under an arbitrary extension.
pub fn write_png_bytes_source(
    env: &TestEnv,
    rel: &str,
    width: u32,
    height: u32,
) -> PathBuf {
    let path = env.source_root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([0, 128, 255]));
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("failed to write source image");
    path
}

// =============================================================================
// Assertions
// =============================================================================

pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() > 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF
}

pub fn is_valid_png(data: &[u8]) -> bool {
    data.len() > 8 && data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
}

/// Decode an encoded image and return its pixel dimensions.
pub fn decoded_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("failed to decode image");
    (img.width(), img.height())
}

/// Decode the file at `path` and return its pixel dimensions.
pub fn decoded_file_dimensions(path: &Path) -> (u32, u32) {
    let data = std::fs::read(path).unwrap();
    decoded_dimensions(&data)
}
