//! Retrieval provider service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use primitive_types::U256;
use rm_01_popularity_cache::{LfuCache, RequestCache};
use rm_02_correlation_registry::{CorrelationRegistry, Unsubscribe};
use rm_03_connection_fallback::connect_any;
use rm_telemetry::{
    metric_inc, time_histogram, PROVIDER_REPLY_DURATION, PROVIDER_REPLY_FAILURES,
    PROVIDER_REQUESTS_MALFORMED, PROVIDER_REQUESTS_RECEIVED, PROVIDER_RESPONSES_SENT,
};
use shared_types::{
    decode_frame, encode_frame, Address, Params, PeerId, Request, RequestKey, Response, Transport,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::domain::{Pricing, ProviderConfig};
use crate::error::ProviderError;
use crate::ports::inbound::{ReplyHandle, RequestCallback, RetrievalProviderApi};
use crate::ports::outbound::ContentStore;

type RequestObservers = CorrelationRegistry<RequestKey, Request>;

/// Provider-side protocol engine.
///
/// Cheap to clone; clones share all state. The receive loop started by
/// [`RetrievalProvider::start`] only holds a weak reference, so dropping the
/// last clone stops it.
pub struct RetrievalProvider<T, S, C> {
    inner: Arc<ProviderInner<T, S, C>>,
}

struct ProviderInner<T, S, C> {
    transport: Arc<T>,
    store: Arc<S>,
    cache: Arc<C>,
    observers: RequestObservers,
    pricing: RwLock<Pricing>,
    protocol: String,
    span: Span,
    shutdown: watch::Sender<bool>,
    started: AtomicBool,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T, S, C> Clone for RetrievalProvider<T, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> RetrievalProvider<T, S, LfuCache>
where
    T: Transport + 'static,
    S: ContentStore + 'static,
{
    /// Provider with an LFU popularity cache sized from `config.cache_capacity`.
    pub fn with_lfu_cache(transport: Arc<T>, store: Arc<S>, config: ProviderConfig) -> Self {
        let cache = Arc::new(LfuCache::new(config.cache_capacity));
        Self::new(transport, store, cache, config)
    }
}

impl<T, S, C> RetrievalProvider<T, S, C>
where
    T: Transport + 'static,
    S: ContentStore + 'static,
    C: RequestCache + 'static,
{
    /// Provider logging under a `retrieval_provider` span.
    pub fn new(transport: Arc<T>, store: Arc<S>, cache: Arc<C>, config: ProviderConfig) -> Self {
        let span = info_span!("retrieval_provider", peer = %transport.local_peer_id());
        Self::with_span(transport, store, cache, config, span)
    }

    /// Provider with an explicit logging span.
    pub fn with_span(
        transport: Arc<T>,
        store: Arc<S>,
        cache: Arc<C>,
        config: ProviderConfig,
        span: Span,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ProviderInner {
                transport,
                store,
                cache,
                observers: CorrelationRegistry::new(),
                pricing: RwLock::new(config.pricing),
                protocol: config.protocol,
                span,
                shutdown,
                started: AtomicBool::new(false),
                receive_task: Mutex::new(None),
            }),
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.inner.transport.local_peer_id()
    }

    /// Popularity cache every observed request is recorded in.
    pub fn cache(&self) -> &Arc<C> {
        &self.inner.cache
    }

    pub fn protocol(&self) -> &str {
        &self.inner.protocol
    }

    /// Take the broadcast queue and spawn the receive loop.
    pub fn start(&self) -> Result<(), ProviderError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(ProviderError::AlreadyStarted);
        }

        let inbound = match self.inner.transport.inbound_messages() {
            Ok(inbound) => inbound,
            Err(e) => {
                self.inner.started.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        let task = tokio::spawn(
            receive_loop(
                inbound,
                Arc::downgrade(&self.inner),
                self.inner.shutdown.subscribe(),
            )
            .instrument(self.inner.span.clone()),
        );
        *self.inner.receive_task.lock() = Some(task);

        info!(parent: &self.inner.span, "Retrieval provider started");
        Ok(())
    }

    /// Stop pulling broadcast messages. Replies already spawned still complete.
    pub fn stop(&self) {
        self.inner.shutdown.send_replace(true);
        debug!(parent: &self.inner.span, "Retrieval provider stopping");
    }

    /// Whether the receive loop is alive.
    pub fn is_running(&self) -> bool {
        self.inner
            .receive_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Observe requests with a closure instead of a boxed callback.
    pub fn observe_requests<F>(&self, params: &Params, callback: F) -> Unsubscribe
    where
        F: Fn(Request) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(params.request_key(), callback)
    }

    /// Observe requests through a channel.
    pub fn subscribe_channel(
        &self,
        params: &Params,
    ) -> (mpsc::UnboundedReceiver<Request>, Unsubscribe) {
        let (tx, rx) = mpsc::unbounded_channel();
        let unsubscribe = self.observe_requests(params, move |request| {
            let _ = tx.send(request);
        });
        (rx, unsubscribe)
    }
}

impl<T, S, C> ProviderInner<T, S, C>
where
    T: Transport + 'static,
    S: ContentStore + 'static,
    C: RequestCache + 'static,
{
    fn handle_message(&self, payload: &[u8]) -> Result<Option<ReplyHandle>, ProviderError> {
        let _entered = self.span.enter();

        let request: Request = match decode_frame(payload) {
            Ok(request) => request,
            Err(e) => {
                metric_inc!(PROVIDER_REQUESTS_MALFORMED);
                warn!(error = %e, "Dropping malformed request");
                return Err(e.into());
            }
        };
        metric_inc!(PROVIDER_REQUESTS_RECEIVED);

        self.cache.put(request.params.payload_cid.clone());

        if !self.observers.is_empty() {
            self.observers
                .dispatch(&request.params.request_key(), request.clone());
        }

        match self.store.has(&request.params) {
            Ok(true) => {}
            Ok(false) => {
                debug!(payload = %request.params.payload_cid, "Content not held, ignoring request");
                return Ok(None);
            }
            Err(e) => {
                warn!(payload = %request.params.payload_cid, error = %e, "Content lookup failed");
                return Err(e.into());
            }
        }

        if request.reply_addrs.is_empty() {
            metric_inc!(PROVIDER_REPLY_FAILURES);
            warn!(payload = %request.params.payload_cid, "Request carries no reply addresses");
            return Err(ProviderError::NoAddressesProvided);
        }

        let response = self.build_response(request.params);
        let transport = Arc::clone(&self.transport);
        let protocol = self.protocol.clone();
        let reply_addrs = request.reply_addrs;

        let handle = tokio::spawn(
            async move { deliver_response(&*transport, &protocol, &response, &reply_addrs).await }
                .instrument(Span::current()),
        );
        Ok(Some(handle))
    }

    fn build_response(&self, params: Params) -> Response {
        let pricing = *self.pricing.read();
        Response {
            params,
            provider: self.transport.local_peer_id(),
            price_per_byte: pricing.price_per_byte,
            payment_interval: pricing.payment_interval,
            payment_interval_increase: pricing.payment_interval_increase,
        }
    }
}

#[async_trait]
impl<T, S, C> RetrievalProviderApi for RetrievalProvider<T, S, C>
where
    T: Transport + 'static,
    S: ContentStore + 'static,
    C: RequestCache + 'static,
{
    fn handle_message(&self, payload: &[u8]) -> Result<Option<ReplyHandle>, ProviderError> {
        self.inner.handle_message(payload)
    }

    async fn respond(&self, request: &Request) -> Result<Address, ProviderError> {
        let response = self.inner.build_response(request.params.clone());
        deliver_response(
            &*self.inner.transport,
            &self.inner.protocol,
            &response,
            &request.reply_addrs,
        )
        .instrument(self.inner.span.clone())
        .await
    }

    fn subscribe_to_requests(&self, callback: RequestCallback, params: &Params) -> Unsubscribe {
        self.inner.observers.subscribe(params.request_key(), callback)
    }

    fn set_price_per_byte(&self, amount: U256) {
        self.inner.pricing.write().price_per_byte = amount;
        debug!(parent: &self.inner.span, price_per_byte = %amount, "Price per byte updated");
    }

    fn set_payment_interval(&self, interval: u64, increase: u64) {
        {
            let mut pricing = self.inner.pricing.write();
            pricing.payment_interval = interval;
            pricing.payment_interval_increase = increase;
        }
        debug!(parent: &self.inner.span, interval, increase, "Payment interval updated");
    }

    fn pricing(&self) -> Pricing {
        *self.inner.pricing.read()
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

async fn receive_loop<T, S, C>(
    mut inbound: mpsc::Receiver<Vec<u8>>,
    provider: Weak<ProviderInner<T, S, C>>,
    mut shutdown: watch::Receiver<bool>,
) where
    T: Transport + 'static,
    S: ContentStore + 'static,
    C: RequestCache + 'static,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            message = inbound.recv() => {
                let Some(message) = message else { break };
                let Some(provider) = provider.upgrade() else { break };
                // Failures are already logged; the reply task runs detached
                if let Err(e) = provider.handle_message(&message) {
                    debug!(error = %e, "Request handling aborted");
                }
            }
        }
    }

    debug!("Request receive loop stopped");
}

/// Find a reachable requester address, open a reply channel and write one frame.
async fn deliver_response<T>(
    transport: &T,
    protocol: &str,
    response: &Response,
    reply_addrs: &[String],
) -> Result<Address, ProviderError>
where
    T: Transport + ?Sized,
{
    let _timer = time_histogram!(PROVIDER_REPLY_DURATION);

    match write_response(transport, protocol, response, reply_addrs).await {
        Ok(addr) => {
            metric_inc!(PROVIDER_RESPONSES_SENT);
            info!(
                payload = %response.params.payload_cid,
                requester = %addr.peer_id(),
                price_per_byte = %response.price_per_byte,
                "Response sent"
            );
            Ok(addr)
        }
        Err(e) => {
            metric_inc!(PROVIDER_REPLY_FAILURES);
            warn!(payload = %response.params.payload_cid, error = %e, "Failed to deliver response");
            Err(e)
        }
    }
}

async fn write_response<T>(
    transport: &T,
    protocol: &str,
    response: &Response,
    reply_addrs: &[String],
) -> Result<Address, ProviderError>
where
    T: Transport + ?Sized,
{
    let addr = connect_any(transport, reply_addrs).await?;
    let frame = encode_frame(response)?;

    let mut channel = transport.open_channel(&addr, protocol).await?;
    channel
        .write_all(&frame)
        .await
        .map_err(|e| ProviderError::Io(e.to_string()))?;
    channel
        .shutdown()
        .await
        .map_err(|e| ProviderError::Io(e.to_string()))?;

    Ok(addr)
}
