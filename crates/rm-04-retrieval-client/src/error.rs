//! Client errors.

use std::time::Duration;

use shared_types::{CodecError, TransportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Client already started")]
    AlreadyStarted,

    #[error("No response within {0:?}")]
    Timeout(Duration),
}
