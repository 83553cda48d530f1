//! Per-key observation record.

use std::time::SystemTime;

/// Observation statistics for one content address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheRecord {
    /// Number of times the key has been observed since insertion.
    pub frequency: u64,
    pub insertion_time: SystemTime,
    pub last_access_time: SystemTime,
}

impl CacheRecord {
    /// A fresh record for a key observed for the first time at `now`.
    pub(crate) fn first_seen(now: SystemTime) -> Self {
        Self {
            frequency: 1,
            insertion_time: now,
            last_access_time: now,
        }
    }

    /// Count one more observation at `now`.
    ///
    /// The access time never moves before the insertion time, even if the
    /// wall clock stepped backwards.
    pub(crate) fn observe(&mut self, now: SystemTime) {
        self.frequency = self.frequency.saturating_add(1);
        self.last_access_time = now.max(self.insertion_time);
    }

    /// True for the record returned for untracked keys.
    pub fn is_zero(&self) -> bool {
        self.frequency == 0
    }
}

impl Default for CacheRecord {
    fn default() -> Self {
        Self {
            frequency: 0,
            insertion_time: SystemTime::UNIX_EPOCH,
            last_access_time: SystemTime::UNIX_EPOCH,
        }
    }
}
