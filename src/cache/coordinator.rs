//! Cache coordinator: the request-to-cache-entry state machine.
//!
//! Per cache path, the observed state is derived from filesystem stat calls
//! on every resolution; there is no persistent registry:
//!
//! ```text
//! ABSENT --(generate)--> READY
//! READY  --(staleness on AND source.mtime > entry.mtime)--> STALE --(regenerate)--> READY
//! READY  --(staleness off, or source not newer)--> [terminal hit]
//! ```
//!
//! # Fast path
//!
//! A warm hit is a single stat (plus a second for the mtime comparison when
//! staleness checking is on) and never touches a lock. This branch carries
//! the dominant traffic and must stay lock-free.
//!
//! # Slow path
//!
//! On miss or staleness the coordinator takes the per-key lock from the
//! sharded [`LockTable`], re-checks state under the lock (a waiter usually
//! finds the entry another holder just published and serves it without
//! generating), then transcodes and publishes. Publication stages the
//! output under a unique temporary name in the destination directory and
//! atomically renames it into place, so no reader (the lock-free fast
//! path included) ever observes a partial file.
//!
//! # Cancellation
//!
//! Generation (lock guard included) runs on a spawned task, so a caller
//! that disconnects mid-generation does not abort work that concurrent
//! waiters on the same key depend on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::format::{sniff_path, ImageFormat};
use crate::request::{parse_path, ResizeRequest};
use crate::transcode::{QualityConfig, TranscodeJob, Transcoder};

use super::lock::LockTable;
use super::resolver;

// =============================================================================
// Entry State
// =============================================================================

/// Observed state of a cache entry, derived from filesystem metadata.
///
/// Computed fresh on every call; never cached in process memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No file at the cache path
    Missing,

    /// Entry present and servable
    Ready,

    /// Entry present but the source has been modified since it was written
    Stale,
}

/// Derive the state of `cache_path` relative to `source_file`.
///
/// With staleness checking disabled, any present entry is `Ready`. A source
/// that cannot be stat'ed (deleted after the entry was generated, say) also
/// leaves the entry `Ready`: there is nothing newer to regenerate from.
pub async fn entry_state(
    cache_path: &Path,
    source_file: &Path,
    check_source_mtime: bool,
) -> EntryState {
    let entry_meta = match tokio::fs::metadata(cache_path).await {
        Ok(meta) => meta,
        Err(_) => return EntryState::Missing,
    };

    if !check_source_mtime {
        return EntryState::Ready;
    }

    let source_meta = match tokio::fs::metadata(source_file).await {
        Ok(meta) => meta,
        Err(_) => return EntryState::Ready,
    };

    match (source_meta.modified(), entry_meta.modified()) {
        (Ok(source_mtime), Ok(entry_mtime)) if source_mtime > entry_mtime => EntryState::Stale,
        _ => EntryState::Ready,
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Successful outcome of a resolution, handed to the serving layer.
///
/// The serving layer owns opening the file, mapping the format to a
/// content type, and emitting cache headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Location of the rendered variant on disk
    pub cache_path: PathBuf,

    /// Format of the cached bytes (never `Unknown`)
    pub format: ImageFormat,

    /// Whether the entry was served without invoking the transcoder
    pub cache_hit: bool,
}

// =============================================================================
// Cache Coordinator
// =============================================================================

/// Coordinates concurrent cache resolutions over a shared cache directory.
///
/// # Type Parameters
///
/// * `T` - The transcoder implementation (mocked in tests)
pub struct CacheCoordinator<T: Transcoder> {
    /// Root of the source image tree
    source_root: PathBuf,

    /// Root of the cache tree
    cache_root: PathBuf,

    /// Pixel pipeline
    transcoder: Arc<T>,

    /// Per-key generation locks
    locks: LockTable,

    /// Encoding quality settings passed through to the transcoder
    quality: QualityConfig,

    /// Whether to compare source mtime against entry mtime
    check_source_mtime: bool,

    /// Whether to serialize generation per key. Disabling trades the
    /// single-flight guarantee for lock-free generation; publication
    /// stays atomic either way.
    enable_locking: bool,
}

impl<T: Transcoder> CacheCoordinator<T> {
    /// Create a coordinator with default quality, staleness checking and
    /// locking enabled.
    pub fn new(source_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>, transcoder: T) -> Self {
        Self {
            source_root: source_root.into(),
            cache_root: cache_root.into(),
            transcoder: Arc::new(transcoder),
            locks: LockTable::new(),
            quality: QualityConfig::default(),
            check_source_mtime: true,
            enable_locking: true,
        }
    }

    /// Set the encoding quality configuration.
    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable source mtime staleness checking.
    pub fn with_check_source_mtime(mut self, check: bool) -> Self {
        self.check_source_mtime = check;
        self
    }

    /// Enable or disable per-key generation locking.
    pub fn with_locking(mut self, enable: bool) -> Self {
        self.enable_locking = enable;
        self
    }

    /// Use a lock table with a specific shard count.
    pub fn with_lock_shards(mut self, shards: usize) -> Self {
        self.locks = LockTable::with_shards(shards);
        self
    }

    /// Root of the source image tree.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Root of the cache tree.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Resolve a raw request path to a ready cache entry.
    ///
    /// # Errors
    ///
    /// * [`ResolveError::InvalidRequest`] - malformed path; nothing touched
    /// * [`ResolveError::SourceNotFound`] - no source image; no cache file
    ///   or directory is created for the request
    /// * [`ResolveError::StorageUnavailable`] - cache directory or file
    ///   operation failed
    /// * [`ResolveError::TranscodeFailed`] - decode/resize/encode failed
    ///
    /// Every failure leaves the filesystem as if the attempt never
    /// happened, so a later request retries cleanly.
    pub async fn resolve(&self, raw_path: &str) -> Result<Resolution, ResolveError> {
        let req = parse_path(raw_path)?;
        self.resolve_request(req).await
    }

    /// Resolve an already-parsed request.
    pub async fn resolve_request(&self, req: ResizeRequest) -> Result<Resolution, ResolveError> {
        let cache_path = resolver::cache_path(&self.cache_root, &req);
        let source_file = req.source_file(&self.source_root);

        // Fast path: a confirmed hit never blocks on a lock.
        if entry_state(&cache_path, &source_file, self.check_source_mtime).await
            == EntryState::Ready
        {
            let format = self.hit_format(&req, &cache_path).await;
            debug!(cache_path = %cache_path.display(), "cache hit");
            return Ok(Resolution {
                cache_path,
                format,
                cache_hit: true,
            });
        }

        // Source must exist before any cache directories are created, so a
        // request for a missing image leaves no trace under the cache root.
        if tokio::fs::metadata(&source_file).await.is_err() {
            debug!(source = %source_file.display(), "source not found");
            return Err(ResolveError::SourceNotFound {
                source: req.source_path.clone(),
            });
        }

        resolver::ensure_parent_dir(&cache_path).await?;

        let guard = if self.enable_locking {
            let guard = self.locks.lock(&cache_path).await;

            // Double-checked: another holder may have published a valid
            // entry while this caller waited on the lock.
            if entry_state(&cache_path, &source_file, self.check_source_mtime).await
                == EntryState::Ready
            {
                drop(guard);
                let format = self.hit_format(&req, &cache_path).await;
                debug!(cache_path = %cache_path.display(), "cache hit after lock wait");
                return Ok(Resolution {
                    cache_path,
                    format,
                    cache_hit: true,
                });
            }
            Some(guard)
        } else {
            None
        };

        self.generate(req, source_file, cache_path, guard).await
    }

    /// Run generation on a spawned task so caller cancellation cannot abort
    /// it; the lock guard travels with the task.
    async fn generate(
        &self,
        req: ResizeRequest,
        source_file: PathBuf,
        cache_path: PathBuf,
        guard: Option<OwnedMutexGuard<()>>,
    ) -> Result<Resolution, ResolveError> {
        let transcoder = Arc::clone(&self.transcoder);
        let quality = self.quality;
        let task_cache_path = cache_path.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            generate_entry(transcoder, req, source_file, task_cache_path, quality).await
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(ResolveError::StorageUnavailable {
                path: cache_path.display().to_string(),
                reason: format!("generation task failed: {e}"),
            }),
        }
    }

    /// Format reported for a cache hit. A known hint is authoritative; an
    /// unknown one is resolved by sniffing the cached bytes.
    async fn hit_format(&self, req: &ResizeRequest, cache_path: &Path) -> ImageFormat {
        if !req.format_hint.is_unknown() {
            return req.format_hint;
        }
        match sniff_path(cache_path).await {
            Ok(Some(format)) => format,
            _ => ImageFormat::Jpeg,
        }
    }
}

// =============================================================================
// Generation
// =============================================================================

/// Monotonic suffix for temp file names within this process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate and atomically publish one cache entry.
async fn generate_entry<T: Transcoder>(
    transcoder: Arc<T>,
    req: ResizeRequest,
    source_file: PathBuf,
    cache_path: PathBuf,
    quality: QualityConfig,
) -> Result<Resolution, ResolveError> {
    // Re-check under the lock; the source may have vanished while waiting.
    if tokio::fs::metadata(&source_file).await.is_err() {
        return Err(ResolveError::SourceNotFound {
            source: req.source_path.clone(),
        });
    }

    let format = if req.format_hint.is_unknown() {
        match sniff_path(&source_file).await {
            Ok(Some(format)) => format,
            Ok(None) => ImageFormat::Jpeg,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResolveError::SourceNotFound {
                    source: req.source_path.clone(),
                });
            }
            Err(e) => {
                return Err(ResolveError::StorageUnavailable {
                    path: source_file.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    } else {
        req.format_hint
    };

    debug!(
        source = %source_file.display(),
        cache_path = %cache_path.display(),
        width = req.width,
        height = req.height,
        format = format.name(),
        "generating cache entry"
    );

    let output = transcoder
        .transcode(TranscodeJob {
            source: source_file,
            target_width: req.width,
            target_height: req.height,
            format,
            quality,
        })
        .await
        .map_err(|cause| ResolveError::TranscodeFailed {
            source: req.source_path.clone(),
            cause,
        })?;

    publish(&cache_path, &output.data).await?;

    debug!(
        cache_path = %cache_path.display(),
        bytes = output.data.len(),
        width = output.width,
        height = output.height,
        "cache entry published"
    );

    Ok(Resolution {
        cache_path,
        format: output.format,
        cache_hit: false,
    })
}

/// Stage bytes under a unique temporary name next to the destination, then
/// atomically rename into place. A failed write never leaves a visible file
/// at the cache path, and the temp file is removed on any failure.
async fn publish(cache_path: &Path, data: &[u8]) -> Result<(), ResolveError> {
    let parent = cache_path
        .parent()
        .ok_or_else(|| ResolveError::StorageUnavailable {
            path: cache_path.display().to_string(),
            reason: "cache path has no parent directory".to_string(),
        })?;

    let file_name = cache_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".to_string());

    // Same-directory temp name keeps the rename atomic (same filesystem).
    let temp = parent.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = tokio::fs::write(&temp, data).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(ResolveError::StorageUnavailable {
            path: temp.display().to_string(),
            reason: e.to_string(),
        });
    }

    if let Err(e) = tokio::fs::rename(&temp, cache_path).await {
        warn!(temp = %temp.display(), error = %e, "failed to publish cache entry");
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(ResolveError::StorageUnavailable {
            path: cache_path.display().to_string(),
            reason: e.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
