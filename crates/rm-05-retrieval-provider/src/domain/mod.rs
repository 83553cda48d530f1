//! Provider domain: configuration and quoted terms.

use primitive_types::U256;
use shared_types::RETRIEVAL_PROTOCOL_ID;

/// Default number of distinct content addresses tracked for popularity.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Largest cache capacity accepted from a config file.
pub const MAX_CACHE_CAPACITY: usize = 1 << 24;

/// Price terms quoted in every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Pricing {
    pub price_per_byte: U256,
    pub payment_interval: u64,
    pub payment_interval_increase: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Protocol identifier used when opening reply channels.
    pub protocol: String,
    /// Initial price terms; adjustable at runtime.
    pub pricing: Pricing,
    /// Capacity of the popularity cache built by `RetrievalProvider::with_lfu_cache`.
    pub cache_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            protocol: RETRIEVAL_PROTOCOL_ID.to_string(),
            pricing: Pricing::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ProviderConfig {
    #[must_use]
    pub fn with_price_per_byte(mut self, price: U256) -> Self {
        self.pricing.price_per_byte = price;
        self
    }

    #[must_use]
    pub fn with_payment_interval(mut self, interval: u64, increase: u64) -> Self {
        self.pricing.payment_interval = interval;
        self.pricing.payment_interval_increase = increase;
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }
}
