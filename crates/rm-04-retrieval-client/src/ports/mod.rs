//! Ports for the retrieval client.
//!
//! The only driven port is [`shared_types::Transport`].

pub mod inbound;
