//! Least-frequently-used popularity cache.

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use parking_lot::Mutex;
use rm_telemetry::{metric_inc, CACHE_EVICTIONS};
use shared_types::ContentId;
use tracing::debug;

use super::record::CacheRecord;
use super::PREALLOCATE_LIMIT;
use crate::ports::RequestCache;

/// Eviction rank: lowest frequency first, then least recently touched.
type Rank = (u64, u64);

struct Entry {
    record: CacheRecord,
    rank: Rank,
}

#[derive(Default)]
struct LfuState {
    entries: HashMap<ContentId, Entry>,
    by_rank: BTreeMap<Rank, ContentId>,
    next_touch: u64,
}

/// Cache that evicts the least frequently observed key when full.
///
/// Among keys with equal frequency the one touched longest ago goes first.
pub struct LfuCache {
    state: Mutex<LfuState>,
    capacity: usize,
}

impl LfuCache {
    /// A cache holding at most `capacity` keys. A capacity of 0 records nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LfuState {
                entries: HashMap::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
                ..LfuState::default()
            }),
            capacity,
        }
    }
}

impl RequestCache for LfuCache {
    fn put(&self, key: ContentId) {
        if self.capacity == 0 {
            return;
        }

        let now = SystemTime::now();
        let evicted = {
            let mut guard = self.state.lock();
            let LfuState {
                entries,
                by_rank,
                next_touch,
            } = &mut *guard;

            let touch = *next_touch;
            *next_touch += 1;

            if let Some(entry) = entries.get_mut(&key) {
                by_rank.remove(&entry.rank);
                entry.record.observe(now);
                entry.rank = (entry.record.frequency, touch);
                by_rank.insert(entry.rank, key);
                None
            } else {
                let evicted = if entries.len() >= self.capacity {
                    by_rank.pop_first().map(|(_, victim)| {
                        entries.remove(&victim);
                        victim
                    })
                } else {
                    None
                };

                let rank = (1, touch);
                by_rank.insert(rank, key.clone());
                entries.insert(
                    key,
                    Entry {
                        record: CacheRecord::first_seen(now),
                        rank,
                    },
                );
                evicted
            }
        };

        if let Some(victim) = evicted {
            metric_inc!(CACHE_EVICTIONS);
            debug!(key = %victim, "Evicted least frequently used request");
        }
    }

    fn keys(&self) -> Vec<ContentId> {
        self.state.lock().entries.keys().cloned().collect()
    }

    fn get_record(&self, key: &ContentId) -> CacheRecord {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.record.clone())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
