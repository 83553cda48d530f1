//! # Error Types
//!
//! Errors shared across subsystems: address parsing, frame codec and transport.

use thiserror::Error;

/// Errors produced while parsing an [`Address`](crate::Address).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The address string was empty.
    #[error("Empty address")]
    Empty,

    /// The address has no `/p2p/<peer>` component.
    #[error("Address has no peer id component: {0}")]
    MissingPeerId(String),

    /// The `/p2p/` component is present but the peer id is empty or malformed.
    #[error("Invalid peer id in address: {0}")]
    InvalidPeerId(String),
}

/// Errors produced by the newline-delimited JSON codec.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Empty frame")]
    Empty,
}

/// Errors surfaced by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer is known but cannot be reached at the given address.
    #[error("Address unreachable: {0}")]
    Unreachable(String),

    /// No peer with this identity is known to the transport.
    #[error("Unknown peer: {0}")]
    UnknownPeer(String),

    /// The remote peer has no handler for the requested protocol.
    #[error("Protocol not supported by remote: {0}")]
    UnsupportedProtocol(String),

    /// A one-shot resource (inbound queue, protocol handler) was already claimed.
    #[error("Already taken: {0}")]
    AlreadyTaken(String),

    /// The transport has been shut down.
    #[error("Transport closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
