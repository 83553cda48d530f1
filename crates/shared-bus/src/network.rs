//! # In-Memory Network Hub
//!
//! Shared membership table for all nodes of one in-process network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{Address, BoxedReader, PeerId, TransportError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::transport::InMemoryTransport;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Membership record of a joined node.
pub(crate) struct Member {
    pub(crate) addresses: Vec<Address>,
    pub(crate) inbound: mpsc::Sender<Vec<u8>>,
    pub(crate) handlers: HashMap<String, mpsc::Sender<BoxedReader>>,
}

pub(crate) struct Hub {
    members: Mutex<HashMap<PeerId, Member>>,
    unreachable: Mutex<HashSet<Address>>,
    next_index: AtomicU64,
    messages_broadcast: AtomicU64,
    channels_opened: AtomicU64,
    capacity: usize,
}

impl Hub {
    /// Fan a payload out to every member except `from`. Returns the delivery count.
    pub(crate) fn broadcast(&self, from: &PeerId, payload: &[u8]) -> Result<usize, TransportError> {
        let targets: Vec<(PeerId, mpsc::Sender<Vec<u8>>)> = {
            let members = self.members.lock();
            if !members.contains_key(from) {
                return Err(TransportError::Closed);
            }
            members
                .iter()
                .filter(|(id, _)| *id != from)
                .map(|(id, m)| (id.clone(), m.inbound.clone()))
                .collect()
        };

        self.messages_broadcast.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        for (peer, sender) in targets {
            match sender.try_send(payload.to_vec()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(peer = %peer, "Inbound queue full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(peer = %peer, "Inbound queue closed, message dropped");
                }
            }
        }

        debug!(from = %from, receivers = delivered, "Message broadcast");
        Ok(delivered)
    }

    /// Check that `addr` routes to a live member.
    pub(crate) fn resolve(&self, addr: &Address) -> Result<(), TransportError> {
        if self.unreachable.lock().contains(addr) {
            return Err(TransportError::Unreachable(addr.to_string()));
        }

        let members = self.members.lock();
        let member = members
            .get(addr.peer_id())
            .ok_or_else(|| TransportError::UnknownPeer(addr.peer_id().to_string()))?;
        if !member.addresses.contains(addr) {
            return Err(TransportError::Unreachable(addr.to_string()));
        }
        Ok(())
    }

    /// Handler registered by the member behind `addr` for `protocol`.
    pub(crate) fn handler(
        &self,
        addr: &Address,
        protocol: &str,
    ) -> Result<mpsc::Sender<BoxedReader>, TransportError> {
        let members = self.members.lock();
        members
            .get(addr.peer_id())
            .ok_or_else(|| TransportError::UnknownPeer(addr.peer_id().to_string()))?
            .handlers
            .get(protocol)
            .cloned()
            .ok_or_else(|| TransportError::UnsupportedProtocol(protocol.to_string()))
    }

    pub(crate) fn register_handler(
        &self,
        peer: &PeerId,
        protocol: &str,
    ) -> Result<mpsc::Receiver<BoxedReader>, TransportError> {
        let mut members = self.members.lock();
        let member = members.get_mut(peer).ok_or(TransportError::Closed)?;
        if member.handlers.contains_key(protocol) {
            return Err(TransportError::AlreadyTaken(protocol.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        member.handlers.insert(protocol.to_string(), tx);
        Ok(rx)
    }

    pub(crate) fn record_channel_opened(&self) {
        self.channels_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn remove(&self, peer: &PeerId) {
        if self.members.lock().remove(peer).is_some() {
            debug!(peer = %peer, "Node left network");
        }
    }
}

/// Handle to an in-process network. Cloning shares the same membership table.
#[derive(Clone)]
pub struct InMemoryNetwork {
    hub: Arc<Hub>,
}

impl InMemoryNetwork {
    /// Create a network with the default per-member queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a network whose members buffer at most `capacity` messages.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hub: Arc::new(Hub {
                members: Mutex::new(HashMap::new()),
                unreachable: Mutex::new(HashSet::new()),
                next_index: AtomicU64::new(0),
                messages_broadcast: AtomicU64::new(0),
                channels_opened: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Join a new node with a single address.
    #[must_use]
    pub fn join(&self) -> InMemoryTransport {
        self.join_with_addresses(1)
    }

    /// Join a new node advertising `count` distinct addresses (at least one).
    #[must_use]
    pub fn join_with_addresses(&self, count: usize) -> InMemoryTransport {
        let peer_id = PeerId::random();
        let index = self.hub.next_index.fetch_add(1, Ordering::Relaxed);
        let addresses: Vec<Address> = (0..count.max(1))
            .map(|slot| Address::new(&format!("/memory/{}/slot/{}", index, slot), &peer_id))
            .collect();

        let (inbound_tx, inbound_rx) = mpsc::channel(self.hub.capacity);
        self.hub.members.lock().insert(
            peer_id.clone(),
            Member {
                addresses: addresses.clone(),
                inbound: inbound_tx,
                handlers: HashMap::new(),
            },
        );

        debug!(peer = %peer_id, addresses = addresses.len(), "Node joined network");
        InMemoryTransport::new(self.hub.clone(), peer_id, addresses, inbound_rx)
    }

    /// Mark an address as (un)reachable. Dialing an unreachable address fails.
    pub fn set_reachable(&self, addr: &Address, reachable: bool) {
        let mut unreachable = self.hub.unreachable.lock();
        if reachable {
            unreachable.remove(addr);
        } else {
            unreachable.insert(addr.clone());
        }
    }

    /// Number of joined nodes.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.hub.members.lock().len()
    }

    /// Total broadcasts attempted on this network.
    #[must_use]
    pub fn messages_broadcast(&self) -> u64 {
        self.hub.messages_broadcast.load(Ordering::Relaxed)
    }

    /// Total direct channels successfully opened.
    #[must_use]
    pub fn channels_opened(&self) -> u64 {
        self.hub.channels_opened.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}
