//! # Market Scenarios
//!
//! Several clients and providers sharing one network, requesters that are
//! only partly reachable, hostile broadcast traffic, and providers built from
//! on-disk configuration.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use primitive_types::U256;
    use rm_01_popularity_cache::RequestCache;
    use rm_04_retrieval_client::{ClientError, RetrievalClientApi};
    use rm_05_retrieval_provider::{
        JsonFileContentStore, ProviderConfig, RetrievalProvider, RetrievalProviderApi,
    };
    use shared_types::{ContentId, Params, PeerId, Transport};
    use tokio::time::timeout;

    use crate::integration::harness::{Market, REPLY_WINDOW};

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    // =============================================================================
    // MANY TO MANY
    // =============================================================================

    #[tokio::test]
    async fn test_three_clients_three_providers() {
        let market = Market::new().unwrap();
        let providers: Vec<_> = (1..=3)
            .map(|price| {
                market
                    .provider(
                        &["bafy-shared"],
                        ProviderConfig::default().with_price_per_byte(U256::from(price as u64)),
                    )
                    .unwrap()
            })
            .collect();
        let clients: Vec<_> = (0..3).map(|_| market.client().unwrap()).collect();
        let params = Params::new("bafy-shared");

        let (a, b, c) = tokio::join!(
            clients[0].client.query(params.clone(), REPLY_WINDOW),
            clients[1].client.query(params.clone(), REPLY_WINDOW),
            clients[2].client.query(params.clone(), REPLY_WINDOW),
        );

        let expected: HashSet<PeerId> = providers.iter().map(|p| p.peer_id()).collect();
        for responses in [a.unwrap(), b.unwrap(), c.unwrap()] {
            assert_eq!(responses.len(), 3);
            let identities: HashSet<PeerId> =
                responses.iter().map(|r| r.provider.clone()).collect();
            assert_eq!(identities, expected);
            assert!(responses.iter().all(|r| r.params == params));
        }
        assert_eq!(market.network.channels_opened(), 9);
    }

    #[tokio::test]
    async fn test_clients_only_see_their_own_requests() {
        let market = Market::new().unwrap();
        let _provider = market
            .provider(&["bafy-a", "bafy-b"], ProviderConfig::default())
            .unwrap();
        let alice = market.client().unwrap();
        let bob = market.client().unwrap();

        let (to_alice, to_bob) = tokio::join!(
            alice.client.query(Params::new("bafy-a"), REPLY_WINDOW),
            bob.client.query(Params::new("bafy-b"), REPLY_WINDOW),
        );

        let to_alice = to_alice.unwrap();
        let to_bob = to_bob.unwrap();
        assert_eq!(to_alice.len(), 1);
        assert_eq!(to_bob.len(), 1);
        assert_eq!(to_alice[0].params, Params::new("bafy-a"));
        assert_eq!(to_bob[0].params, Params::new("bafy-b"));
    }

    // =============================================================================
    // CONNECTION FALLBACK
    // =============================================================================

    #[tokio::test]
    async fn test_reply_falls_back_past_unreachable_addresses() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], ProviderConfig::default()).unwrap();
        let client = market.client_with_addresses(3).unwrap();

        let addrs = client.transport.local_addresses();
        market.network.set_reachable(&addrs[0], false);
        market.network.set_reachable(&addrs[1], false);

        let response = client
            .client
            .await_response(Params::new("bafy-x"), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response.provider, provider.peer_id());
        assert_eq!(market.network.channels_opened(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_client_gets_nothing() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], ProviderConfig::default()).unwrap();
        let client = market.client_with_addresses(2).unwrap();
        for addr in client.transport.local_addresses() {
            market.network.set_reachable(&addr, false);
        }

        let result = client
            .client
            .await_response(Params::new("bafy-x"), Duration::from_millis(300))
            .await;

        assert!(matches!(result, Err(ClientError::Timeout(_))));
        assert!(provider.provider.is_running());
        assert_eq!(market.network.channels_opened(), 0);
    }

    // =============================================================================
    // HOSTILE TRAFFIC
    // =============================================================================

    #[tokio::test]
    async fn test_malformed_broadcast_does_not_stop_provider() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], ProviderConfig::default()).unwrap();
        let client = market.client().unwrap();
        let rogue = market.network.join();

        rogue.broadcast(b"not json at all\n".to_vec()).await.unwrap();
        rogue.broadcast(b"{\"params\":{}}\n".to_vec()).await.unwrap();
        rogue.broadcast(Vec::new()).await.unwrap();

        let response = client
            .client
            .await_response(Params::new("bafy-x"), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response.provider, provider.peer_id());
        assert!(provider.provider.is_running());
    }

    #[tokio::test]
    async fn test_stopped_provider_stays_silent() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], ProviderConfig::default()).unwrap();
        let client = market.client().unwrap();

        provider.provider.stop();
        wait_until(|| !provider.provider.is_running()).await;

        let responses = client
            .client
            .query(Params::new("bafy-x"), Duration::from_millis(200))
            .await
            .unwrap();
        assert!(responses.is_empty());
    }

    // =============================================================================
    // PROVIDER BOOKKEEPING
    // =============================================================================

    #[tokio::test]
    async fn test_cache_tracks_unserved_demand() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], ProviderConfig::default()).unwrap();
        let client = market.client().unwrap();

        for _ in 0..3 {
            client.client.submit(Params::new("bafy-wanted")).await.unwrap();
        }
        client.client.submit(Params::new("bafy-x")).await.unwrap();

        let cache = provider.provider.cache().clone();
        wait_until(|| cache.get_record(&ContentId::new("bafy-wanted")).frequency == 3).await;
        wait_until(|| cache.get_record(&ContentId::new("bafy-x")).frequency == 1).await;
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_content_added_at_runtime_is_served() {
        let market = Market::new().unwrap();
        let provider = market.provider(&[], ProviderConfig::default()).unwrap();
        let client = market.client().unwrap();

        let before = client
            .client
            .query(Params::new("bafy-late"), Duration::from_millis(200))
            .await
            .unwrap();
        assert!(before.is_empty());

        provider.store.insert("bafy-late");

        let after = client
            .client
            .await_response(Params::new("bafy-late"), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(after.provider, provider.peer_id());
    }

    // =============================================================================
    // FILE-BACKED PROVIDER
    // =============================================================================

    #[tokio::test]
    async fn test_provider_from_config_and_content_files() {
        let market = Market::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let config_path = dir.path().join("provider.toml");
        std::fs::write(
            &config_path,
            "[pricing]\nprice_per_byte = \"1000000000000000000000000\"\npayment_interval = 2048\n\n[cache]\ncapacity = 2\n",
        )
        .unwrap();
        let content_path = dir.path().join("content.json");
        std::fs::write(&content_path, r#"["bafy-on-disk"]"#).unwrap();

        let config = ProviderConfig::load(&config_path).unwrap();
        let store = Arc::new(JsonFileContentStore::load(&content_path).unwrap());
        let transport = Arc::new(market.network.join());
        let provider = RetrievalProvider::with_lfu_cache(transport, store, config);
        provider.start().unwrap();
        let client = market.client().unwrap();

        let response = client
            .client
            .await_response(Params::new("bafy-on-disk"), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(
            response.price_per_byte,
            U256::from_dec_str("1000000000000000000000000").unwrap()
        );
        assert_eq!(response.payment_interval, 2048);
        assert_eq!(provider.cache().capacity(), 2);
        assert_eq!(provider.pricing().price_per_byte, response.price_per_byte);
    }
}
