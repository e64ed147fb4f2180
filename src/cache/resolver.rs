//! Cache path resolution.
//!
//! Maps a [`ResizeRequest`] to its deterministic location in the cache tree.
//!
//! # Layout
//!
//! ```text
//! <cacheRoot>/<width>x<height>_<relativeSourcePath>
//! ```
//!
//! The source's subdirectory structure is preserved beneath the dimension
//! prefix, so `/200x100/photos/dog.jpg` lands at
//! `<cacheRoot>/200x100_photos/dog.jpg`. Equal `(width, height, sourcePath)`
//! tuples always map to the same path, and distinct tuples never collide:
//! the dimension prefix and the validated source path are both
//! unambiguous.

use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::request::ResizeRequest;

/// Compute the cache path for a request.
///
/// Pure function of `(cache_root, width, height, source_path)`; no
/// filesystem access.
pub fn cache_path(cache_root: &Path, req: &ResizeRequest) -> PathBuf {
    cache_root.join(format!(
        "{}x{}_{}",
        req.width, req.height, req.source_path
    ))
}

/// Create the directory tree a cache path needs before a write.
///
/// Idempotent: pre-existing directories are not an error, and creation races
/// between concurrent callers are tolerated (`create_dir_all` handles both).
pub async fn ensure_parent_dir(path: &Path) -> Result<(), ResolveError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };

    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ResolveError::StorageUnavailable {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Tests
// =============================================================================
