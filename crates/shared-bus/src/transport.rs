//! # In-Memory Transport
//!
//! Per-node handle implementing the `Transport` capability over the hub.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Address, BoxedReader, BoxedWriter, PeerId, Transport, TransportError};
use tokio::sync::mpsc;
use tracing::debug;

use crate::network::Hub;
use crate::DIRECT_CHANNEL_BUFFER;

/// A node joined to an [`InMemoryNetwork`](crate::InMemoryNetwork).
///
/// Dropping the handle removes the node from the network.
pub struct InMemoryTransport {
    hub: Arc<Hub>,
    peer_id: PeerId,
    addresses: Vec<Address>,
    inbound: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
}

impl InMemoryTransport {
    pub(crate) fn new(
        hub: Arc<Hub>,
        peer_id: PeerId,
        addresses: Vec<Address>,
        inbound: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        Self {
            hub,
            peer_id,
            addresses,
            inbound: Mutex::new(Some(inbound)),
        }
    }

    /// Leave the network. Later operations fail with `Closed`.
    pub fn leave(&self) {
        self.hub.remove(&self.peer_id);
    }
}

impl Drop for InMemoryTransport {
    fn drop(&mut self) {
        self.hub.remove(&self.peer_id);
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn local_peer_id(&self) -> PeerId {
        self.peer_id.clone()
    }

    fn local_addresses(&self) -> Vec<Address> {
        self.addresses.clone()
    }

    async fn broadcast(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.hub.broadcast(&self.peer_id, &payload).map(|_| ())
    }

    fn inbound_messages(&self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        self.inbound
            .lock()
            .take()
            .ok_or_else(|| TransportError::AlreadyTaken("inbound messages".to_string()))
    }

    async fn connect(&self, addr: &Address) -> Result<(), TransportError> {
        self.hub.resolve(addr)
    }

    async fn open_channel(
        &self,
        addr: &Address,
        protocol: &str,
    ) -> Result<BoxedWriter, TransportError> {
        self.hub.resolve(addr)?;
        let handler = self.hub.handler(addr, protocol)?;

        let (writer, reader) = tokio::io::duplex(DIRECT_CHANNEL_BUFFER);
        let reader: BoxedReader = Box::new(reader);
        handler
            .send(reader)
            .await
            .map_err(|_| TransportError::Closed)?;

        self.hub.record_channel_opened();
        debug!(from = %self.peer_id, to = %addr, protocol, "Direct channel opened");
        Ok(Box::new(writer))
    }

    fn accept_channels(
        &self,
        protocol: &str,
    ) -> Result<mpsc::Receiver<BoxedReader>, TransportError> {
        self.hub.register_handler(&self.peer_id, protocol)
    }
}
