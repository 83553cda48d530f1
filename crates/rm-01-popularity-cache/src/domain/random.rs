//! Fixed-size request set with random eviction.

use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use rm_telemetry::{metric_inc, CACHE_EVICTIONS};
use shared_types::ContentId;
use tracing::debug;

use super::record::CacheRecord;
use super::PREALLOCATE_LIMIT;
use crate::ports::RequestCache;

/// Cache that drops an arbitrary entry when a new key arrives at capacity.
///
/// Cheaper than [`LfuCache`](super::LfuCache) and policy-free, which makes it
/// a convenient stand-in where eviction order does not matter.
pub struct RandomEvictionCache {
    items: Mutex<HashMap<ContentId, CacheRecord>>,
    capacity: usize,
}

impl RandomEvictionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::with_capacity(capacity.min(PREALLOCATE_LIMIT))),
            capacity,
        }
    }

    /// Up to `n` tracked keys, in no particular order.
    pub fn sample(&self, n: usize) -> Vec<ContentId> {
        self.items.lock().keys().take(n).cloned().collect()
    }
}

impl RequestCache for RandomEvictionCache {
    fn put(&self, key: ContentId) {
        if self.capacity == 0 {
            return;
        }

        let now = SystemTime::now();
        let evicted = {
            let mut items = self.items.lock();
            if let Some(record) = items.get_mut(&key) {
                record.observe(now);
                return;
            }

            let evicted = if items.len() >= self.capacity {
                let victim = items.keys().choose(&mut rand::thread_rng()).cloned();
                if let Some(victim) = &victim {
                    items.remove(victim);
                }
                victim
            } else {
                None
            };

            items.insert(key, CacheRecord::first_seen(now));
            evicted
        };

        if let Some(victim) = evicted {
            metric_inc!(CACHE_EVICTIONS);
            debug!(key = %victim, "Evicted random request");
        }
    }

    fn keys(&self) -> Vec<ContentId> {
        self.items.lock().keys().cloned().collect()
    }

    fn get_record(&self, key: &ContentId) -> CacheRecord {
        self.items.lock().get(key).cloned().unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let cache = RandomEvictionCache::new(3);
        for i in 0..20 {
            cache.put(ContentId::new(format!("cid{}", i)));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
        // The most recent key is always present after its own insertion
        assert!(cache.keys().contains(&ContentId::new("cid19")));
    }

    #[test]
    fn test_reput_existing_key_keeps_members() {
        let cache = RandomEvictionCache::new(2);
        cache.put(ContentId::new("a"));
        cache.put(ContentId::new("b"));
        cache.put(ContentId::new("a"));

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec![ContentId::new("a"), ContentId::new("b")]);
        assert_eq!(cache.get_record(&ContentId::new("a")).frequency, 2);
    }

    #[test]
    fn test_sample() {
        let cache = RandomEvictionCache::new(5);
        for i in 0..5 {
            cache.put(ContentId::new(format!("cid{}", i)));
        }

        assert_eq!(cache.sample(2).len(), 2);
        assert_eq!(cache.sample(10).len(), 5);
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let cache = RandomEvictionCache::new(usize::MAX);
        cache.put(ContentId::new("a"));

        assert_eq!(cache.capacity(), usize::MAX);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_usable_as_trait_object() {
        let cache: Box<dyn RequestCache> = Box::new(RandomEvictionCache::new(1));
        cache.put(ContentId::new("x"));
        assert_eq!(cache.capacity(), 1);
        assert!(!cache.is_empty());
    }
}
