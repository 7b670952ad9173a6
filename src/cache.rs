use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Packs an unordered vertex-index pair into a single cache key, matching
/// the `s == t` / `t == s` symmetry of `Oracle::query`.
fn pack(a: u32, b: u32) -> u64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    ((lo as u64) << 32) | hi as u64
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Query-result cache keyed by a compact `(s, t)` vertex-index pair rather
/// than the token strings themselves — tokens can be arbitrary length,
/// while every oracle query already resolves to a cheap `u32` pair.
///
/// Caching is a pure HTTP-layer convenience: `Oracle::query` itself is
/// already `O(|L|)` and lock-free, so this exists to avoid repeated
/// `index_of` + table lookups under load, not because any single query is
/// expensive.
pub struct QueryCache {
    entries: Mutex<LruCache<u64, u32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }

    pub fn get(&self, s: u32, t: u32) -> Option<u32> {
        let mut entries = self.entries.lock();
        let found = entries.get(&pack(s, t)).copied();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn insert(&self, s: u32, t: u32, distance: u32) {
        self.entries.lock().put(pack(s, t), distance);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            capacity: entries.cap().get(),
            len: entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_after_insert() {
        let cache = QueryCache::new(8);
        assert_eq!(cache.get(1, 2), None);
        cache.insert(1, 2, 7);
        assert_eq!(cache.get(1, 2), Some(7));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn lookup_is_order_independent() {
        let cache = QueryCache::new(8);
        cache.insert(3, 9, 4);
        assert_eq!(cache.get(9, 3), Some(4));
    }

    #[test]
    fn evicts_least_recently_used_past_capacity() {
        let cache = QueryCache::new(2);
        cache.insert(1, 2, 1);
        cache.insert(3, 4, 2);
        cache.insert(5, 6, 3); // evicts (1, 2), the least recently touched
        assert_eq!(cache.get(1, 2), None);
        assert_eq!(cache.get(3, 4), Some(2));
        assert_eq!(cache.get(5, 6), Some(3));
    }
}
