//! Process-local TTL cache.
//!
//! Backs the Config Store's step-graph cache: reads are served from memory
//! until the entry's TTL elapses or a write explicitly invalidates it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default TTL for cached config reads (spec: "per-process, TTL ≤ 5 minutes").
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A process-local cache with a fixed TTL and explicit invalidation.
///
/// Survivable if ablated: every caller must handle a miss by recomputing
/// from the source of truth (the database), so dropping the whole cache
/// only costs latency, never correctness.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
    stats: RwLock<CacheStats>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL)
    }

    /// Returns the cached value if present and not yet expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        if let Some(entry) = entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                self.stats.write().expect("cache lock poisoned").hits += 1;
                return Some(entry.value.clone());
            }
        }
        self.stats.write().expect("cache lock poisoned").misses += 1;
        None
    }

    pub fn put(&self, key: K, value: V) {
        self.entries.write().expect("cache lock poisoned").insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Invalidates one entry, e.g. on write-through for a changed pipeline step.
    pub fn invalidate(&self, key: &K) {
        if self
            .entries
            .write()
            .expect("cache lock poisoned")
            .remove(key)
            .is_some()
        {
            self.stats.write().expect("cache lock poisoned").invalidations += 1;
        }
    }

    /// Invalidates every entry, used after a config-store-wide write.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let n = entries.len() as u64;
        entries.clear();
        self.stats.write().expect("cache lock poisoned").invalidations += n;
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read().expect("cache lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_then_miss_after_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(20));
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: TtlCache<&str, u32> = TtlCache::with_default_ttl();
        cache.put("step_graph", 7);
        cache.invalidate(&"step_graph");
        assert_eq!(cache.get(&"step_graph"), None);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn invalidate_all_clears_every_key() {
        let cache: TtlCache<&str, u32> = TtlCache::with_default_ttl();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.invalidate_all();
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), None);
    }
}
