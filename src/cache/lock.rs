//! Sharded per-key lock table.
//!
//! Generation must be mutually exclusive per cache path, but a single global
//! lock would serialize generation of unrelated keys. The table hashes each
//! cache path onto a fixed set of shards, each guarded by its own async
//! mutex: identical requests always land on the same shard (and therefore
//! serialize), while requests for distinct keys usually proceed in parallel.
//!
//! Two distinct keys can hash to the same shard and serialize needlessly;
//! that costs throughput, never correctness. The hash is the std
//! `DefaultHasher`, which is deterministic for a given input.
//!
//! Guards are handed out as [`OwnedMutexGuard`]s so the coordinator can move
//! a guard into a spawned generation task and keep the key locked even if
//! the requesting caller disconnects mid-generation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Default number of lock shards.
pub const DEFAULT_LOCK_SHARDS: usize = 64;

/// Hash-sharded table of per-key mutexes.
pub struct LockTable {
    shards: Vec<Arc<Mutex<()>>>,
}

impl LockTable {
    /// Create a table with [`DEFAULT_LOCK_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_LOCK_SHARDS)
    }

    /// Create a table with a specific shard count (must be > 0).
    pub fn with_shards(shards: usize) -> Self {
        assert!(shards > 0, "lock table needs at least one shard");
        Self {
            shards: (0..shards).map(|_| Arc::new(Mutex::new(()))).collect(),
        }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard index a key hashes to.
    pub fn shard_index(&self, key: &Path) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Acquire the lock for a key, waiting until the current holder (if any)
    /// finishes. The guard is owned so it can outlive the caller's future.
    pub async fn lock(&self, key: &Path) -> OwnedMutexGuard<()> {
        let shard = Arc::clone(&self.shards[self.shard_index(key)]);
        shard.lock_owned().await
    }

    /// Try to acquire the lock for a key without waiting.
    pub fn try_lock(&self, key: &Path) -> Option<OwnedMutexGuard<()>> {
        let shard = Arc::clone(&self.shards[self.shard_index(key)]);
        shard.try_lock_owned().ok()
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
