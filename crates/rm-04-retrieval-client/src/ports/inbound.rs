//! Inbound ports (API) for the retrieval client.

use std::time::Duration;

use async_trait::async_trait;
use rm_02_correlation_registry::Unsubscribe;
use shared_types::{Params, Response};

use crate::error::ClientError;

/// Listener invoked once per matching response.
pub type ResponseCallback = Box<dyn Fn(Response) + Send + Sync>;

/// Primary API for requesting content.
#[async_trait]
pub trait RetrievalClientApi: Send + Sync {
    /// Broadcast a request for `params`, advertising this node's addresses.
    ///
    /// Does not subscribe: call `subscribe_to_responses` first to observe replies.
    async fn submit(&self, params: Params) -> Result<(), ClientError>;

    /// Invoke `callback` for every response whose params equal `params`.
    fn subscribe_to_responses(&self, callback: ResponseCallback, params: &Params) -> Unsubscribe;

    /// Decode a raw reply and dispatch it. Returns how many subscribers saw it.
    ///
    /// Malformed payloads are logged and dropped.
    fn handle_provider_response(&self, payload: &[u8]) -> usize;

    /// Subscribe, submit, and collect every response arriving within `wait`.
    async fn query(&self, params: Params, wait: Duration) -> Result<Vec<Response>, ClientError>;
}
