//! Inbound ports (API) for the retrieval provider.

use async_trait::async_trait;
use primitive_types::U256;
use rm_02_correlation_registry::Unsubscribe;
use shared_types::{Address, Params, Request};
use tokio::task::JoinHandle;

use crate::domain::Pricing;
use crate::error::ProviderError;

/// Reply work spawned for a request the provider can serve.
pub type ReplyHandle = JoinHandle<Result<Address, ProviderError>>;

/// Observer invoked for every decoded request with matching params.
pub type RequestCallback = Box<dyn Fn(Request) + Send + Sync>;

/// Primary API for serving retrieval requests.
#[async_trait]
pub trait RetrievalProviderApi: Send + Sync {
    /// Process one broadcast payload.
    ///
    /// Returns `Ok(None)` when the content is not held (no reply is sent), or
    /// the handle of the spawned reply task. Must run inside a tokio runtime.
    fn handle_message(&self, payload: &[u8]) -> Result<Option<ReplyHandle>, ProviderError>;

    /// Build a response for `request` and deliver it inline.
    ///
    /// Returns the requester address the response was written to.
    async fn respond(&self, request: &Request) -> Result<Address, ProviderError>;

    /// Observe decoded requests for `params`.
    fn subscribe_to_requests(&self, callback: RequestCallback, params: &Params) -> Unsubscribe;

    /// Change the quoted price. Applies to responses built after the call.
    fn set_price_per_byte(&self, amount: U256);

    /// Change the quoted payment interval. Applies to responses built after the call.
    fn set_payment_interval(&self, interval: u64, increase: u64);

    /// Currently quoted terms.
    fn pricing(&self) -> Pricing;
}
