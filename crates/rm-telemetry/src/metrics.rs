//! Prometheus metrics for the retrieval market.
//!
//! All metrics follow the naming convention: `rm_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PROVIDER METRICS
    // =========================================================================

    /// Broadcast requests that decoded successfully
    pub static ref PROVIDER_REQUESTS_RECEIVED: Counter = Counter::new(
        "rm_provider_requests_received_total",
        "Total retrieval requests received by the provider"
    ).expect("metric creation failed");

    /// Broadcast payloads that failed to decode
    pub static ref PROVIDER_REQUESTS_MALFORMED: Counter = Counter::new(
        "rm_provider_requests_malformed_total",
        "Total broadcast payloads the provider could not decode"
    ).expect("metric creation failed");

    /// Responses written to a client
    pub static ref PROVIDER_RESPONSES_SENT: Counter = Counter::new(
        "rm_provider_responses_sent_total",
        "Total responses delivered to requesting clients"
    ).expect("metric creation failed");

    /// Reply attempts that failed (no address, unreachable, write error)
    pub static ref PROVIDER_REPLY_FAILURES: Counter = Counter::new(
        "rm_provider_reply_failures_total",
        "Total reply attempts that could not be delivered"
    ).expect("metric creation failed");

    /// Time spent connecting to a client and writing the response
    pub static ref PROVIDER_REPLY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "rm_provider_reply_duration_seconds",
            "Time spent delivering a response to a client"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("bucket creation failed"))
    ).expect("metric creation failed");

    // =========================================================================
    // CLIENT METRICS
    // =========================================================================

    /// Requests broadcast by the client
    pub static ref CLIENT_REQUESTS_SUBMITTED: Counter = Counter::new(
        "rm_client_requests_submitted_total",
        "Total retrieval requests broadcast by the client"
    ).expect("metric creation failed");

    /// Responses read from reply channels
    pub static ref CLIENT_RESPONSES_RECEIVED: Counter = Counter::new(
        "rm_client_responses_received_total",
        "Total responses received by the client"
    ).expect("metric creation failed");

    /// Responses handed to at least one subscriber
    pub static ref CLIENT_RESPONSES_DISPATCHED: Counter = Counter::new(
        "rm_client_responses_dispatched_total",
        "Total responses delivered to at least one subscriber"
    ).expect("metric creation failed");

    /// Responses for keys with no subscriber
    pub static ref CLIENT_RESPONSES_UNMATCHED: Counter = Counter::new(
        "rm_client_responses_unmatched_total",
        "Total responses dropped because nobody was subscribed"
    ).expect("metric creation failed");

    /// Reply payloads that failed to decode
    pub static ref CLIENT_RESPONSES_MALFORMED: Counter = Counter::new(
        "rm_client_responses_malformed_total",
        "Total reply payloads the client could not decode"
    ).expect("metric creation failed");

    // =========================================================================
    // CACHE METRICS
    // =========================================================================

    /// Entries evicted from popularity caches
    pub static ref CACHE_EVICTIONS: Counter = Counter::new(
        "rm_cache_evictions_total",
        "Total entries evicted from request popularity caches"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Metrics that are already registered are skipped, so repeated calls succeed.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Provider
        Box::new(PROVIDER_REQUESTS_RECEIVED.clone()),
        Box::new(PROVIDER_REQUESTS_MALFORMED.clone()),
        Box::new(PROVIDER_RESPONSES_SENT.clone()),
        Box::new(PROVIDER_REPLY_FAILURES.clone()),
        Box::new(PROVIDER_REPLY_DURATION.clone()),
        // Client
        Box::new(CLIENT_REQUESTS_SUBMITTED.clone()),
        Box::new(CLIENT_RESPONSES_RECEIVED.clone()),
        Box::new(CLIENT_RESPONSES_DISPATCHED.clone()),
        Box::new(CLIENT_RESPONSES_UNMATCHED.clone()),
        Box::new(CLIENT_RESPONSES_MALFORMED.clone()),
        // Cache
        Box::new(CACHE_EVICTIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
