//! # Retrieval Market Test Suite
//!
//! Cross-crate scenarios running real clients and providers over the
//! in-memory transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs   # Network + node builders shared by the flows
//!     ├── flows.rs     # Single request/response flows
//!     └── market.rs    # Many clients, many providers, degraded networks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rm-tests
//! cargo test -p rm-tests integration::market::
//! ```

#![allow(dead_code)]

pub mod integration;
