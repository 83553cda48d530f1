//! Retrieval client service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rm_02_correlation_registry::{CorrelationRegistry, Unsubscribe};
use rm_telemetry::{
    metric_inc, CLIENT_REQUESTS_SUBMITTED, CLIENT_RESPONSES_DISPATCHED, CLIENT_RESPONSES_MALFORMED,
    CLIENT_RESPONSES_RECEIVED, CLIENT_RESPONSES_UNMATCHED,
};
use shared_types::{
    decode_frame, encode_frame, BoxedReader, Params, PeerId, Request, RequestKey, Response,
    Transport, FRAME_DELIMITER,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::domain::ClientConfig;
use crate::error::ClientError;
use crate::ports::inbound::{ResponseCallback, RetrievalClientApi};

type ResponseRegistry = CorrelationRegistry<RequestKey, Response>;

/// Client-side protocol engine.
///
/// `start` must be called from within a tokio runtime before replies can be
/// received; `submit` and the subscription methods work without it.
pub struct RetrievalClient<T> {
    transport: Arc<T>,
    registry: ResponseRegistry,
    config: ClientConfig,
    span: Span,
    shutdown: watch::Sender<bool>,
    started: AtomicBool,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport + 'static> RetrievalClient<T> {
    /// Client with default config, logging under a `retrieval_client` span.
    pub fn new(transport: Arc<T>) -> Self {
        let span = info_span!("retrieval_client", peer = %transport.local_peer_id());
        Self::with_config(transport, ClientConfig::default(), span)
    }

    /// Client with explicit config and logging span.
    pub fn with_config(transport: Arc<T>, config: ClientConfig, span: Span) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            registry: CorrelationRegistry::new(),
            config,
            span,
            shutdown,
            started: AtomicBool::new(false),
            accept_task: Mutex::new(None),
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.transport.local_peer_id()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register the reply-channel handler and spawn the accept loop.
    pub fn start(&self) -> Result<(), ClientError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyStarted);
        }

        let incoming = match self.transport.accept_channels(&self.config.protocol) {
            Ok(incoming) => incoming,
            Err(e) => {
                self.started.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        let task = tokio::spawn(
            accept_loop(
                incoming,
                self.registry.clone(),
                self.shutdown.subscribe(),
                self.config.max_frame_bytes,
                self.config.reply_read_timeout,
            )
            .instrument(self.span.clone()),
        );
        *self.accept_task.lock() = Some(task);

        info!(parent: &self.span, protocol = %self.config.protocol, "Retrieval client started");
        Ok(())
    }

    /// Stop accepting reply channels. Replies already being read still dispatch.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
        debug!(parent: &self.span, "Retrieval client stopping");
    }

    /// Whether the accept loop is alive.
    pub fn is_running(&self) -> bool {
        self.accept_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Subscribe with a channel instead of a callback.
    pub fn subscribe_channel(
        &self,
        params: &Params,
    ) -> (mpsc::UnboundedReceiver<Response>, Unsubscribe) {
        let (tx, rx) = mpsc::unbounded_channel();
        let unsubscribe = self.registry.subscribe(params.request_key(), move |response| {
            // Receiver gone means the caller stopped listening
            let _ = tx.send(response);
        });
        (rx, unsubscribe)
    }

    /// Submit and wait for the first response, failing with `Timeout` after `wait`.
    pub async fn await_response(
        &self,
        params: Params,
        wait: Duration,
    ) -> Result<Response, ClientError> {
        let (mut rx, unsubscribe) = self.subscribe_channel(&params);

        let outcome = match self.submit(params).await {
            Ok(()) => match tokio::time::timeout(wait, rx.recv()).await {
                Ok(Some(response)) => Ok(response),
                Ok(None) | Err(_) => Err(ClientError::Timeout(wait)),
            },
            Err(e) => Err(e),
        };

        unsubscribe.unsubscribe();
        outcome
    }

    /// Number of listeners currently waiting on `params`.
    pub fn subscriber_count(&self, params: &Params) -> usize {
        self.registry.subscriber_count(&params.request_key())
    }
}

impl<T> Drop for RetrievalClient<T> {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

#[async_trait]
impl<T: Transport + 'static> RetrievalClientApi for RetrievalClient<T> {
    async fn submit(&self, params: Params) -> Result<(), ClientError> {
        let request = Request {
            params,
            reply_addrs: self
                .transport
                .local_addresses()
                .iter()
                .map(ToString::to_string)
                .collect(),
        };
        let payload = encode_frame(&request)?;

        self.transport
            .broadcast(payload)
            .instrument(self.span.clone())
            .await?;

        metric_inc!(CLIENT_REQUESTS_SUBMITTED);
        debug!(
            parent: &self.span,
            payload = %request.params.payload_cid,
            reply_addrs = request.reply_addrs.len(),
            "Request submitted"
        );
        Ok(())
    }

    fn subscribe_to_responses(&self, callback: ResponseCallback, params: &Params) -> Unsubscribe {
        self.registry.subscribe(params.request_key(), callback)
    }

    fn handle_provider_response(&self, payload: &[u8]) -> usize {
        let _entered = self.span.enter();
        dispatch_reply(&self.registry, payload)
    }

    async fn query(&self, params: Params, wait: Duration) -> Result<Vec<Response>, ClientError> {
        let (mut rx, unsubscribe) = self.subscribe_channel(&params);
        if let Err(e) = self.submit(params).await {
            unsubscribe.unsubscribe();
            return Err(e);
        }

        let deadline = Instant::now() + wait;
        let mut responses = Vec::new();
        while let Ok(Some(response)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            responses.push(response);
        }

        unsubscribe.unsubscribe();
        debug!(parent: &self.span, responses = responses.len(), "Query window closed");
        Ok(responses)
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

async fn accept_loop(
    mut incoming: mpsc::Receiver<BoxedReader>,
    registry: ResponseRegistry,
    mut shutdown: watch::Receiver<bool>,
    max_frame_bytes: usize,
    read_timeout: Duration,
) {
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
            stream = incoming.recv() => match stream {
                Some(stream) => {
                    tokio::spawn(
                        read_reply(stream, registry.clone(), max_frame_bytes, read_timeout)
                            .instrument(Span::current()),
                    );
                }
                None => break,
            },
        }
    }

    debug!("Reply accept loop stopped");
}

/// Read one newline-terminated frame from a reply channel and dispatch it.
///
/// A channel that stays open without completing a frame is dropped after
/// `read_timeout`.
async fn read_reply(
    stream: BoxedReader,
    registry: ResponseRegistry,
    max_frame_bytes: usize,
    read_timeout: Duration,
) {
    let mut reader = BufReader::new(stream.take(max_frame_bytes as u64));
    let mut frame = Vec::new();

    let read = reader.read_until(FRAME_DELIMITER, &mut frame);
    match tokio::time::timeout(read_timeout, read).await {
        Ok(Ok(0)) => debug!("Reply channel closed before any data"),
        Ok(Ok(_)) => {
            dispatch_reply(&registry, &frame);
        }
        Ok(Err(e)) => warn!(error = %e, "Failed to read reply channel"),
        Err(_) => warn!(timeout = ?read_timeout, "Reply channel idle, dropping it"),
    }
}

fn dispatch_reply(registry: &ResponseRegistry, payload: &[u8]) -> usize {
    metric_inc!(CLIENT_RESPONSES_RECEIVED);

    let response: Response = match decode_frame(payload) {
        Ok(response) => response,
        Err(e) => {
            metric_inc!(CLIENT_RESPONSES_MALFORMED);
            warn!(error = %e, "Dropping malformed provider response");
            return 0;
        }
    };

    let key = response.request_key();
    let payload_cid = response.params.payload_cid.clone();
    let provider = response.provider.clone();

    let delivered = registry.dispatch(&key, response);
    if delivered > 0 {
        metric_inc!(CLIENT_RESPONSES_DISPATCHED);
        info!(
            payload = %payload_cid,
            provider = %provider,
            subscribers = delivered,
            "Response received for outstanding request"
        );
    } else {
        metric_inc!(CLIENT_RESPONSES_UNMATCHED);
        debug!(payload = %payload_cid, provider = %provider, "Response for unknown request");
    }
    delivered
}
