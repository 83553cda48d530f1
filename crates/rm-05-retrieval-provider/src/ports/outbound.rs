//! Outbound ports (SPI) for the retrieval provider.
//!
//! Besides the content store, the provider depends on
//! [`shared_types::Transport`] and [`rm_01_popularity_cache::RequestCache`].

use std::sync::Arc;

use shared_types::Params;

use crate::error::StoreError;

/// Content availability oracle.
pub trait ContentStore: Send + Sync {
    /// Whether this provider can serve `params`.
    fn has(&self, params: &Params) -> Result<bool, StoreError>;
}

impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    fn has(&self, params: &Params) -> Result<bool, StoreError> {
        (**self).has(params)
    }
}
