//! Time-boxed query result cache
//!
//! Entries are keyed by `(strategy, value, root identity)` and expire after a
//! TTL. Expiry is the only invalidation mechanism: a scheduled eviction task
//! removes each entry at TTL, backed by a read-time staleness guard so an
//! entry can never be observed past its deadline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use steadyweb_core_types::{ElementHandle, TargetId};

use crate::types::SelectorDescriptor;

/// Default time-to-live for cached result sets.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    strategy: &'static str,
    value: String,
    root: String,
}

impl CacheKey {
    pub fn new(
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Self {
        Self {
            strategy: descriptor.strategy.name(),
            value: descriptor.cache_value(),
            root: match root {
                Some(root) => format!("{target}/{root}"),
                None => format!("{target}/document"),
            },
        }
    }
}

struct CacheEntry {
    handles: Vec<ElementHandle>,
    stored_at: Instant,
    generation: u64,
}

/// Hit/miss/eviction counters for the cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

/// Last-writer-wins result cache with TTL expiry.
///
/// Not designed for contended multi-threaded mutation; the lock makes it
/// safe, the semantics stay last-writer-wins.
pub struct QueryCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry; stale entries are dropped on read.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<ElementHandle>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.handles.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result set and schedule its eviction at TTL.
    ///
    /// Must be called from within a tokio runtime.
    pub fn insert(&self, key: CacheKey, handles: Vec<ElementHandle>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(
                key.clone(),
                CacheEntry {
                    handles,
                    stored_at: Instant::now(),
                    generation,
                },
            );
        }

        let entries = Arc::clone(&self.entries);
        let evictions = Arc::clone(&self.evictions);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut entries = entries.lock().unwrap();
            // Only evict if the entry was not overwritten in the meantime.
            if entries
                .get(&key)
                .map(|entry| entry.generation == generation)
                .unwrap_or(false)
            {
                entries.remove(&key);
                evictions.fetch_add(1, Ordering::Relaxed);
                debug!(?key, "cache entry evicted at TTL");
            }
        });
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.lock().unwrap().len(),
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
