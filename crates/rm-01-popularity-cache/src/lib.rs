//! # Popularity Cache Subsystem (rm-01)
//!
//! Bounded tracking of how often each content address has been requested.
//! Providers record every observed request here, whether or not they can
//! serve it, so the cache measures demand rather than satisfied demand.
//!
//! ## Architecture
//!
//! - **Ports Layer** (`ports/`): `RequestCache`, the capability providers depend on
//! - **Domain Layer** (`domain/`): `CacheRecord` plus two eviction policies
//!   - `LfuCache`: evicts the least frequently requested entry
//!   - `RandomEvictionCache`: evicts an arbitrary entry, for tests and substitution
//!
//! ## Invariants
//!
//! - The cache never holds more than its configured capacity.
//! - A record's frequency never decreases while it is cached.
//! - `last_access_time >= insertion_time` for every record.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;

pub use domain::{CacheRecord, LfuCache, RandomEvictionCache};
pub use ports::RequestCache;
