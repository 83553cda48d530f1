//! # Shared Types Crate
//!
//! Wire types, identifiers and the transport capability shared by every
//! retrieval-market subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Params`, `Request` and `Response` are defined
//!   once here and used by both the client and the provider.
//! - **Deterministic Correlation**: `Params::request_key()` yields the canonical
//!   `RequestKey` that both sides use to match replies to requests.
//! - **One Transport Surface**: every engine consumes the network through the
//!   single `Transport` trait, never through a concrete host type.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod entities;
pub mod errors;
pub mod transport;

pub use codec::{decode_frame, encode_frame, FRAME_DELIMITER};
pub use entities::*;
pub use errors::*;
pub use transport::{BoxedReader, BoxedWriter, Transport};

/// Protocol identifier used as the broadcast topic and the reply-channel protocol.
pub const RETRIEVAL_PROTOCOL_ID: &str = "/fil/secondary-retrieval/0.0.1";
