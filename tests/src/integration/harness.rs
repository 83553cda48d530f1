//! Builders for retrieval-market nodes on a shared in-memory network.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rm_01_popularity_cache::LfuCache;
use rm_04_retrieval_client::RetrievalClient;
use rm_05_retrieval_provider::{MemoryContentStore, ProviderConfig, RetrievalProvider};
use rm_telemetry::{init_telemetry, TelemetryConfig};
use shared_bus::{InMemoryNetwork, InMemoryTransport};
use shared_types::PeerId;

pub type TestProvider = RetrievalProvider<InMemoryTransport, MemoryContentStore, LfuCache>;
pub type TestClient = RetrievalClient<InMemoryTransport>;

/// How long flows wait for replies before concluding none will come.
pub const REPLY_WINDOW: Duration = Duration::from_millis(500);

/// A started provider plus handles to its collaborators.
pub struct ProviderNode {
    pub provider: TestProvider,
    pub transport: Arc<InMemoryTransport>,
    pub store: Arc<MemoryContentStore>,
}

impl ProviderNode {
    pub fn peer_id(&self) -> PeerId {
        self.provider.peer_id()
    }
}

/// A started client plus its transport.
pub struct ClientNode {
    pub client: TestClient,
    pub transport: Arc<InMemoryTransport>,
}

/// One in-memory network with telemetry installed.
pub struct Market {
    pub network: InMemoryNetwork,
}

impl Market {
    pub fn new() -> Result<Self> {
        init_telemetry(&TelemetryConfig::for_component("tests"))?;
        Ok(Self {
            network: InMemoryNetwork::new(),
        })
    }

    /// Join and start a provider holding `held`, priced per `config`.
    pub fn provider(&self, held: &[&str], config: ProviderConfig) -> Result<ProviderNode> {
        let transport = Arc::new(self.network.join());
        let store = Arc::new(MemoryContentStore::with_content(held.iter().copied()));
        let provider = RetrievalProvider::with_lfu_cache(transport.clone(), store.clone(), config);
        provider.start()?;

        Ok(ProviderNode {
            provider,
            transport,
            store,
        })
    }

    /// Join and start a client advertising a single address.
    pub fn client(&self) -> Result<ClientNode> {
        self.client_with_addresses(1)
    }

    /// Join and start a client advertising `count` addresses.
    pub fn client_with_addresses(&self, count: usize) -> Result<ClientNode> {
        let transport = Arc::new(self.network.join_with_addresses(count));
        let client = RetrievalClient::new(transport.clone());
        client.start()?;

        Ok(ClientNode { client, transport })
    }
}
