//! # Retrieval Client Subsystem (rm-04)
//!
//! Broadcasts retrieval requests and routes the direct replies of providers
//! back to whoever subscribed to the request's parameters.
//!
//! ## Architecture Role
//!
//! ```text
//! submit(params) ──broadcast Request──→ [Provider A] [Provider B] ...
//!                                            │            │
//!                 reply channel (direct) ←───┴────────────┘
//!                        │
//!                        ↓ decode Response
//!              [Correlation Registry] ──→ subscriber callbacks
//! ```
//!
//! A request may yield zero, one or many responses in any order. The
//! protocol has no built-in timeout: callers decide how long to listen and
//! then unsubscribe (or use `query`, which does both).

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::ClientConfig;
pub use error::ClientError;
pub use ports::inbound::{ResponseCallback, RetrievalClientApi};
pub use rm_02_correlation_registry::Unsubscribe;
pub use service::RetrievalClient;
