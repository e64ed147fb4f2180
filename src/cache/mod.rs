//! Cache layer: path resolution, per-key locking, and the coordinator.
//!
//! # Architecture
//!
//! ```text
//! raw path ──▶ request::parse_path ──▶ ResizeRequest
//!                                          │
//!                                          ▼
//!                              resolver::cache_path
//!                                          │
//!                                          ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CacheCoordinator                        │
//! │                                                              │
//! │  fast path: stat ── Ready? ──▶ serve (lock-free)             │
//! │                                                              │
//! │  slow path: ensure dirs ─▶ LockTable ─▶ re-check ─▶          │
//! │             Transcoder ─▶ temp file ─▶ atomic rename         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`resolver`]: deterministic request-to-cache-path mapping
//! - [`LockTable`]: sharded per-key mutual exclusion
//! - [`CacheCoordinator`]: the hit/miss/stale state machine and atomic
//!   publication
//! - [`EntryState`]: cache entry state derived from filesystem metadata

pub mod coordinator;
pub mod lock;
pub mod resolver;

pub use coordinator::{entry_state, CacheCoordinator, EntryState, Resolution};
pub use lock::{LockTable, DEFAULT_LOCK_SHARDS};
pub use resolver::{cache_path, ensure_parent_dir};
