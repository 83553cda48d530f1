//! Provider error types.

use rm_03_connection_fallback::FallbackError;
use shared_types::{CodecError, TransportError};
use thiserror::Error;

/// Errors from handling a single request. None of them stop the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Content store error: {0}")]
    Store(#[from] StoreError),

    #[error("Request carries no reply addresses")]
    NoAddressesProvided,

    #[error("Cannot connect to requester: {0}")]
    CannotConnect(FallbackError),

    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to write response: {0}")]
    Io(String),

    #[error("Provider already started")]
    AlreadyStarted,
}

impl From<FallbackError> for ProviderError {
    fn from(e: FallbackError) -> Self {
        match e {
            FallbackError::NoAddressesProvided => Self::NoAddressesProvided,
            other => Self::CannotConnect(other),
        }
    }
}

/// Content availability lookup errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse content list: {0}")]
    Parse(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Provider configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Cache capacity {capacity} exceeds maximum {max}")]
    CapacityTooLarge { capacity: usize, max: usize },
}
