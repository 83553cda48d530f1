//! # Connection Fallback Subsystem (rm-03)
//!
//! Given the ordered reply addresses a requester advertised, find the first
//! one that can actually be reached.
//!
//! ```text
//! [addr0, addr1, addr2] ──dial addr0──✗──dial addr1──✗──dial addr2──✓──→ addr2
//! ```
//!
//! Trials are strictly sequential in input order: no parallel dialing and no
//! address ranking.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

use async_trait::async_trait;
use shared_types::{Address, Transport, TransportError};
use thiserror::Error;
use tracing::debug;

/// Fallback errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    #[error("No addresses provided")]
    NoAddressesProvided,

    #[error("All {attempts} addresses unreachable, last error: {last_error}")]
    AllAddressesUnreachable { attempts: usize, last_error: String },
}

/// Anything that can establish a route to an address.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, addr: &Address) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Dialer for T {
    async fn dial(&self, addr: &Address) -> Result<(), TransportError> {
        self.connect(addr).await
    }
}

/// Try each address in order and return the first one that connects.
///
/// An address that fails to parse counts as a failed candidate.
pub async fn connect_any<D>(dialer: &D, addrs: &[String]) -> Result<Address, FallbackError>
where
    D: Dialer + ?Sized,
{
    if addrs.is_empty() {
        return Err(FallbackError::NoAddressesProvided);
    }

    let mut last_error = String::new();
    for (attempt, raw) in addrs.iter().enumerate() {
        let addr: Address = match raw.parse() {
            Ok(addr) => addr,
            Err(e) => {
                debug!(attempt, addr = %raw, error = %e, "Skipping unparseable address");
                last_error = e.to_string();
                continue;
            }
        };

        match dialer.dial(&addr).await {
            Ok(()) => {
                debug!(attempt, addr = %addr, "Connected");
                return Ok(addr);
            }
            Err(e) => {
                debug!(attempt, addr = %addr, error = %e, "Dial failed, trying next address");
                last_error = e.to_string();
            }
        }
    }

    Err(FallbackError::AllAddressesUnreachable {
        attempts: addrs.len(),
        last_error,
    })
}
