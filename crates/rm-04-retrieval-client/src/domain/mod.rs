//! Client configuration.

use std::time::Duration;

use shared_types::RETRIEVAL_PROTOCOL_ID;

/// Upper bound on a single reply frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Time a provider has to finish writing its reply frame.
pub const DEFAULT_REPLY_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Protocol identifier of the reply channel providers open to us.
    pub protocol: String,
    /// Reply frames longer than this are truncated and fail to decode.
    pub max_frame_bytes: usize,
    /// Reply channels that have not delivered a full frame by then are dropped.
    pub reply_read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: RETRIEVAL_PROTOCOL_ID.to_string(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            reply_read_timeout: DEFAULT_REPLY_READ_TIMEOUT,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    #[must_use]
    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    #[must_use]
    pub fn with_reply_read_timeout(mut self, timeout: Duration) -> Self {
        self.reply_read_timeout = timeout;
        self
    }
}
