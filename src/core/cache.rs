//! Bounded least-recently-used memo for bracket lookups.
//!
//! Keys are the raw bit patterns of the queried income, so `0.0` and `-0.0`
//! occupy separate slots. Lookups are pure, so a stale or evicted entry only
//! costs a recomputation.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

pub const DEFAULT_BUCKET_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<u64, usize>,
    // Front is least recently used.
    order: VecDeque<u64>,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key);
    }
}

#[derive(Debug)]
pub struct BucketCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BucketCacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl BucketCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn get(&self, value: f64) -> Option<usize> {
        let key = value.to_bits();
        let mut state = self.state.lock();
        match state.entries.get(&key).copied() {
            Some(index) => {
                state.hits += 1;
                state.touch(key);
                Some(index)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, value: f64, index: usize) {
        if self.capacity == 0 {
            return;
        }
        let key = value.to_bits();
        let mut state = self.state.lock();
        if state.entries.insert(key, index).is_none() {
            while state.entries.len() > self.capacity {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
            }
        }
        state.touch(key);
    }

    pub fn stats(&self) -> BucketCacheStats {
        let state = self.state.lock();
        BucketCacheStats {
            len: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
        }
    }
}

impl Clone for BucketCache {
    // Clones start cold; cached lookups are never part of a schedule's identity.
    fn clone(&self) -> Self {
        Self::new(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = BucketCache::new(4);
        assert_eq!(cache.get(12.5), None);
        cache.insert(12.5, 3);
        assert_eq!(cache.get(12.5), Some(3));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn evicts_least_recently_used_entry() {
        let cache = BucketCache::new(2);
        cache.insert(1.0, 0);
        cache.insert(2.0, 1);
        // Refresh 1.0 so 2.0 becomes the eviction candidate.
        assert_eq!(cache.get(1.0), Some(0));
        cache.insert(3.0, 2);

        assert_eq!(cache.get(2.0), None);
        assert_eq!(cache.get(1.0), Some(0));
        assert_eq!(cache.get(3.0), Some(2));
        assert_eq!(cache.stats().len, 2);
    }

    #[test]
    fn reinserting_existing_key_does_not_grow() {
        let cache = BucketCache::new(2);
        cache.insert(1.0, 0);
        cache.insert(1.0, 0);
        cache.insert(2.0, 1);
        assert_eq!(cache.stats().len, 2);
        assert_eq!(cache.get(1.0), Some(0));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let cache = BucketCache::new(0);
        cache.insert(5.0, 1);
        assert_eq!(cache.get(5.0), None);
        assert_eq!(cache.stats().len, 0);
    }
}
