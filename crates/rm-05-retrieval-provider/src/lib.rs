//! # Retrieval Provider Subsystem (rm-05)
//!
//! Listens to broadcast retrieval requests and answers the ones it can serve
//! with a priced response sent directly to the requester.
//!
//! ## Architecture Role
//!
//! ```text
//! broadcast Request ──→ [decode] ──→ [Popularity Cache] (every request)
//!                                 ──→ [request observers]
//!                                 ──→ [ContentStore::has]
//!                                          │ held
//!                                          ↓ spawned reply task
//!                            [Connection Fallback] ──→ direct channel ──→ client
//! ```
//!
//! Not holding the content is answered with silence; there is no negative
//! reply. Every failure is local to one request and never stops the receive
//! loop.
//!
//! ## Layers
//!
//! - **Domain** (`domain/`): `ProviderConfig`, `Pricing`
//! - **Ports** (`ports/`): `RetrievalProviderApi` (inbound), `ContentStore` (outbound)
//! - **Adapters** (`adapters/`): in-memory and JSON-file content stores, TOML config
//! - **Service** (`service.rs`): `RetrievalProvider`

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{JsonFileContentStore, MemoryContentStore};
pub use domain::{Pricing, ProviderConfig, MAX_CACHE_CAPACITY};
pub use error::{ConfigError, ProviderError, StoreError};
pub use ports::inbound::{ReplyHandle, RequestCallback, RetrievalProviderApi};
pub use ports::outbound::ContentStore;
pub use rm_02_correlation_registry::Unsubscribe;
pub use service::RetrievalProvider;
