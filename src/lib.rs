//! # imgserve
//!
//! An on-demand image resizing server with a filesystem cache.
//!
//! Requests name a target geometry and a source image
//! (`/200x100/photos/dog.jpg`); the server resizes and re-encodes the
//! source on first request, caches the rendition on disk, and serves
//! repeated requests straight from the cache.
//!
//! ## Guarantees
//!
//! - **Single-flight**: identical concurrent requests trigger at most one
//!   transcode; unrelated requests generate in parallel (sharded per-key
//!   locking).
//! - **Atomic publication**: cache entries are staged under a temporary
//!   name and renamed into place, so readers never observe a partial file.
//! - **Lock-free hits**: warm-cache traffic is served from filesystem
//!   stat calls alone, without touching a lock.
//! - **Staleness**: optionally, a rendition is regenerated when the source
//!   file's modification time is newer than the cached entry's.
//!
//! ## Architecture
//!
//! - [`request`] - Raw path parsing into a canonical [`ResizeRequest`]
//! - [`mod@format`] - Format classification by extension and magic bytes
//! - [`cache`] - Cache path resolution, per-key locking, and the
//!   hit/miss/stale coordinator
//! - [`transcode`] - The decode/resize/encode pipeline behind the
//!   [`Transcoder`] seam
//! - [`server`] - Axum-based HTTP layer
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use imgserve::{CacheCoordinator, ImageTranscoder, RouterConfig, create_router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = CacheCoordinator::new(
//!         "/var/www/images",
//!         "/var/cache/imgserve",
//!         ImageTranscoder::new(),
//!     );
//!     let router = create_router(coordinator, RouterConfig::default());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod request;
pub mod server;
pub mod transcode;

// Re-export commonly used types
pub use cache::{
    cache_path, ensure_parent_dir, entry_state, CacheCoordinator, EntryState, LockTable,
    Resolution, DEFAULT_LOCK_SHARDS,
};
pub use config::Config;
pub use error::{ParseError, ResolveError, TranscodeError};
pub use format::{sniff_bytes, sniff_path, ImageFormat, SNIFF_PREFIX_LEN};
pub use request::{parse_path, ResizeRequest};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use transcode::{
    clamp_quality, is_valid_quality, ImageTranscoder, QualityConfig, TranscodeJob,
    TranscodeOutput, Transcoder, DEFAULT_JPEG_QUALITY, DEFAULT_PNG_QUALITY_MAX,
    DEFAULT_PNG_QUALITY_MIN, MAX_QUALITY, MIN_QUALITY,
};
