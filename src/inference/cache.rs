//! Bounded LRU memo of predictions keyed by equipment id.
//!
//! Entries are invalidated only by capacity eviction. The key ignores the
//! feature values, so a changed feature row is not seen until the entry is
//! evicted.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;
use tracing::trace;

use crate::common::error::MaintResult;
use crate::data::domain::EquipmentId;

use super::domain::Prediction;

/// Hit/miss counters since construction.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// A prediction together with where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Served {
    pub prediction: Prediction,
    /// False only when this caller's own computation was stored. A value
    /// inserted by a concurrent caller while `compute` ran counts as cached.
    pub cached: bool,
}

pub struct PredictionCache {
    entries: Mutex<LruCache<EquipmentId, Prediction>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PredictionCache {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<EquipmentId, Prediction>> {
        // Entries are plain values; a panic elsewhere cannot leave one half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up and promote an entry.
    pub fn get(&self, id: &EquipmentId) -> Option<Prediction> {
        self.lock().get(id).cloned()
    }

    /// Insert unless a value is already present; returns the value that ends
    /// up cached. Concurrent misses for one key therefore agree on a result.
    pub fn insert_if_absent(&self, id: EquipmentId, prediction: Prediction) -> Prediction {
        self.store(id, prediction).prediction
    }

    fn store(&self, id: EquipmentId, prediction: Prediction) -> Served {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&id) {
            return Served {
                prediction: existing.clone(),
                cached: true,
            };
        }
        if let Some((evicted, _)) = entries.push(id, prediction.clone()) {
            trace!(ev = "cache_evict", equipment_id = %evicted);
        }
        Served {
            prediction,
            cached: false,
        }
    }

    /// Return the cached prediction or run `compute` and cache its result.
    ///
    /// The lock is not held while `compute` runs. Errors are not cached.
    pub async fn get_or_compute<F, Fut>(&self, id: &EquipmentId, compute: F) -> MaintResult<Prediction>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MaintResult<Prediction>>,
    {
        Ok(self.lookup(id, compute).await?.prediction)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), also reporting whether
    /// the returned value was already cached.
    pub async fn lookup<F, Fut>(&self, id: &EquipmentId, compute: F) -> MaintResult<Served>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MaintResult<Prediction>>,
    {
        if let Some(hit) = self.get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Served {
                prediction: hit,
                cached: true,
            });
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let computed = compute().await?;
        Ok(self.store(id.clone(), computed))
    }

    /// Presence check that does not change recency.
    pub fn contains(&self, id: &EquipmentId) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
