//! TOML configuration loading for the provider.
//!
//! ```toml
//! [provider]
//! protocol = "/fil/secondary-retrieval/0.0.1"
//!
//! [pricing]
//! price_per_byte = "1000"          # decimal string, arbitrary precision
//! payment_interval = 1048576
//! payment_interval_increase = 1048576
//!
//! [cache]
//! capacity = 1024
//! ```
//!
//! Every section and field is optional; missing values keep their defaults.
//! `capacity` may not exceed [`MAX_CACHE_CAPACITY`].

use std::fs;
use std::path::Path;

use primitive_types::U256;
use serde::Deserialize;

use crate::domain::{ProviderConfig, MAX_CACHE_CAPACITY};
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    provider: ProviderSection,
    #[serde(default)]
    pricing: PricingSection,
    #[serde(default)]
    cache: CacheSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderSection {
    protocol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PricingSection {
    price_per_byte: Option<String>,
    payment_interval: Option<u64>,
    payment_interval_increase: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    capacity: Option<usize>,
}

impl ProviderConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut config = Self::default();

        if let Some(protocol) = file.provider.protocol {
            config.protocol = protocol;
        }

        let pricing = file.pricing;
        if let Some(price) = pricing.price_per_byte {
            config.pricing.price_per_byte = U256::from_dec_str(price.trim())
                .map_err(|e| ConfigError::Parse(format!("price_per_byte '{}': {:?}", price, e)))?;
        }
        if let Some(interval) = pricing.payment_interval {
            config.pricing.payment_interval = interval;
        }
        if let Some(increase) = pricing.payment_interval_increase {
            config.pricing.payment_interval_increase = increase;
        }

        if let Some(capacity) = file.cache.capacity {
            if capacity > MAX_CACHE_CAPACITY {
                return Err(ConfigError::CapacityTooLarge {
                    capacity,
                    max: MAX_CACHE_CAPACITY,
                });
            }
            config.cache_capacity = capacity;
        }

        Ok(config)
    }
}
