//! Domain layer for the popularity cache.

pub mod lfu;
pub mod random;
pub mod record;

pub use lfu::LfuCache;
pub use random::RandomEvictionCache;
pub use record::CacheRecord;

/// Upper bound on slots reserved up front; larger caches grow on demand.
pub(crate) const PREALLOCATE_LIMIT: usize = 4096;
