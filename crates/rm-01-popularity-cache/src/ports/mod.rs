//! Inbound port for request popularity tracking.

use shared_types::ContentId;

use crate::domain::CacheRecord;

/// A provider's cache of observed requests.
///
/// Every method must be safe to call concurrently from several
/// request-handling tasks.
pub trait RequestCache: Send + Sync {
    /// Record one observation of `key`, evicting an entry first if `key` is
    /// new and the cache is full.
    fn put(&self, key: ContentId);

    /// All tracked keys, in no particular order.
    fn keys(&self) -> Vec<ContentId>;

    /// Record for `key`, or the zero record when it is not tracked.
    fn get_record(&self, key: &ContentId) -> CacheRecord;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of tracked keys.
    fn capacity(&self) -> usize;
}
