//! Adapters: content stores and file-based configuration.

pub mod config;
pub mod store;

pub use store::{JsonFileContentStore, MemoryContentStore};
