//! # Correlation Registry Subsystem (rm-02)
//!
//! Matches asynchronously arriving values (provider responses, observed
//! requests) back to the listeners waiting on their key.
//!
//! ```text
//! subscribe(key, cb) ──→ ┌──────────────────────────┐
//!                        │ key → [(id, cb), ...]    │ ──→ cb(value) for each
//! dispatch(key, value) → └──────────────────────────┘
//!                                  ↑
//!                   Unsubscribe::unsubscribe() removes (key, id)
//! ```
//!
//! ## Guarantees
//!
//! - Keys with no remaining callbacks are removed from the map.
//! - Unsubscribing twice, or after the registry is gone, is a no-op.
//! - Once `unsubscribe()` returns, the callback never runs again.
//! - Dispatching to a key nobody listens on is not an error.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod registry;

pub use registry::{CorrelationRegistry, SubscriptionId, Unsubscribe};
