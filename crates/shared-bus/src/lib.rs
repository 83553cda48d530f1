//! # Shared Bus - In-Process Transport Substrate
//!
//! An in-memory implementation of the `Transport` capability. Every node that
//! joins an [`InMemoryNetwork`] is a member of the single broadcast topic and
//! can open direct channels to any other member.
//!
//! ```text
//! ┌──────────────┐   broadcast()    ┌──────────────┐
//! │   Client     │ ───────┐         │  Provider A  │
//! │              │        │         │              │
//! └──────────────┘        ▼         └──────────────┘
//!        ↑         ┌──────────────┐        │
//!        │         │ InMemory Hub │ ───────┘ inbound_messages()
//!        │         └──────────────┘
//!        └──────── open_channel() (tokio duplex)
//! ```
//!
//! Delivery is best-effort: a member whose inbound queue is full misses the
//! message, exactly like a lossy gossip overlay.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod network;
pub mod transport;

pub use network::InMemoryNetwork;
pub use transport::InMemoryTransport;

/// Messages buffered per member before broadcast drops kick in.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// In-flight bytes buffered on a direct channel.
pub const DIRECT_CHANNEL_BUFFER: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Transport;

    #[tokio::test]
    async fn test_default_network_buffers_default_capacity() {
        let network = InMemoryNetwork::new();
        let a = network.join();
        let b = network.join();
        let mut b_rx = b.inbound_messages().unwrap();

        for i in 0..=DEFAULT_CHANNEL_CAPACITY {
            a.broadcast(i.to_string().into_bytes()).await.unwrap();
        }

        let mut buffered = 0;
        while b_rx.try_recv().is_ok() {
            buffered += 1;
        }
        assert_eq!(buffered, DEFAULT_CHANNEL_CAPACITY);
    }
}
