//! # Core Domain Entities
//!
//! Identifiers and wire messages of the retrieval market.
//!
//! ## Clusters
//!
//! - **Identity**: `ContentId`, `PeerId`, `Address`
//! - **Protocol**: `Params`, `RequestKey`, `Request`, `Response`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AddressError;

// Re-export U256 from primitive-types for price amounts
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Opaque content address (payload or piece CID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity of a node on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identity.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dialable route to a peer: `<transport part>/p2p/<peer id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    raw: String,
    peer_id: PeerId,
}

impl Address {
    const P2P_SEGMENT: &'static str = "/p2p/";

    /// Build an address from its transport part and the peer it routes to.
    pub fn new(transport: &str, peer_id: &PeerId) -> Self {
        let transport = transport.trim_end_matches('/');
        Self {
            raw: format!("{}{}{}", transport, Self::P2P_SEGMENT, peer_id),
            peer_id: peer_id.clone(),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The part of the address before `/p2p/`.
    pub fn transport_part(&self) -> &str {
        let cut = self.raw.len() - self.peer_id.as_str().len() - Self::P2P_SEGMENT.len();
        &self.raw[..cut]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }

        let idx = raw
            .rfind(Self::P2P_SEGMENT)
            .ok_or_else(|| AddressError::MissingPeerId(raw.to_string()))?;
        let peer = &raw[idx + Self::P2P_SEGMENT.len()..];
        if peer.is_empty() || peer.contains('/') {
            return Err(AddressError::InvalidPeerId(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            peer_id: PeerId::new(peer),
        })
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.raw
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// =============================================================================
// CLUSTER B: PROTOCOL
// =============================================================================

/// What a client is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    /// Root content address of the requested payload.
    pub payload_cid: ContentId,
    /// Optional piece containing the payload.
    pub piece_cid: Option<ContentId>,
    /// Optional selector narrowing the payload.
    pub selector: Option<String>,
}

impl Params {
    pub fn new(payload_cid: impl Into<ContentId>) -> Self {
        Self {
            payload_cid: payload_cid.into(),
            piece_cid: None,
            selector: None,
        }
    }

    #[must_use]
    pub fn with_piece(mut self, piece_cid: impl Into<ContentId>) -> Self {
        self.piece_cid = Some(piece_cid.into());
        self
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Canonical correlation key for these parameters.
    ///
    /// Object keys are emitted in sorted order and absent optionals as `null`,
    /// so two equal `Params` always produce byte-identical keys and distinct
    /// `Params` never collide.
    pub fn request_key(&self) -> RequestKey {
        let value = serde_json::json!({
            "payloadCid": self.payload_cid.as_str(),
            "pieceCid": self.piece_cid.as_ref().map(ContentId::as_str),
            "selector": self.selector.as_deref(),
        });
        RequestKey(value.to_string())
    }
}

/// Canonical serialized form of [`Params`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broadcast by clients, observed by providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub params: Params,
    /// Addresses at which the requester accepts replies, in preference order.
    pub reply_addrs: Vec<String>,
}

/// Sent directly from a provider to a client that asked for content it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Echo of the matched request's parameters.
    pub params: Params,
    pub provider: PeerId,
    pub price_per_byte: U256,
    pub payment_interval: u64,
    pub payment_interval_increase: u64,
}

impl Response {
    pub fn request_key(&self) -> RequestKey {
        self.params.request_key()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "payload={} provider={} pricePerByte={} paymentInterval={} paymentIntervalIncrease={}",
            self.params.payload_cid,
            self.provider,
            self.price_per_byte,
            self.payment_interval,
            self.payment_interval_increase
        )
    }
}
