//! The single network capability consumed by the client and provider engines.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::entities::{Address, PeerId};
use crate::errors::TransportError;

/// Write half of a direct channel to a remote peer.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half of a direct channel opened by a remote peer.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Broadcast topic membership plus point-to-point channels.
///
/// Implementations own peer discovery, dialing and stream multiplexing;
/// engines only see the operations below.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identity of this node.
    fn local_peer_id(&self) -> PeerId;

    /// Addresses at which this node can be reached, in preference order.
    fn local_addresses(&self) -> Vec<Address>;

    /// Best-effort fan-out of `payload` to every other topic member.
    async fn broadcast(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Queue of payloads received on the topic.
    ///
    /// The receiver can be taken once; later calls fail with `AlreadyTaken`.
    fn inbound_messages(&self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError>;

    /// Establish a route to `addr`.
    async fn connect(&self, addr: &Address) -> Result<(), TransportError>;

    /// Open a direct write channel to `addr` speaking `protocol`.
    async fn open_channel(&self, addr: &Address, protocol: &str)
        -> Result<BoxedWriter, TransportError>;

    /// Register as the handler for inbound channels of `protocol`.
    fn accept_channels(&self, protocol: &str)
        -> Result<mpsc::Receiver<BoxedReader>, TransportError>;
}
