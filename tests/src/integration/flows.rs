//! # Request/Response Flows
//!
//! One client broadcasting a request and the providers on the network
//! answering it over direct reply channels.
//!
//! ```text
//! client ──broadcast Request──→ provider(s)
//!        ←──reply channel────── Response (params, identity, price terms)
//! ```

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use primitive_types::U256;
    use rm_04_retrieval_client::{ClientError, RetrievalClientApi};
    use rm_05_retrieval_provider::{ProviderConfig, RetrievalProviderApi};
    use shared_types::{Params, PeerId, Transport};
    use tokio::time::timeout;

    use crate::integration::harness::{Market, REPLY_WINDOW};

    fn priced(price: u64) -> ProviderConfig {
        ProviderConfig::default()
            .with_price_per_byte(U256::from(price))
            .with_payment_interval(1 << 20, 1 << 19)
    }

    // =============================================================================
    // SINGLE PROVIDER
    // =============================================================================

    #[tokio::test]
    async fn test_single_provider_answers_once() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], priced(3)).unwrap();
        let client = market.client().unwrap();
        let params = Params::new("bafy-x");

        let responses = client
            .client
            .query(params.clone(), REPLY_WINDOW)
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        let response = &responses[0];
        assert_eq!(response.params, params);
        assert_eq!(response.provider, provider.peer_id());
        assert_eq!(response.price_per_byte, U256::from(3u64));
        assert_eq!(response.payment_interval, 1 << 20);
        assert_eq!(response.payment_interval_increase, 1 << 19);
    }

    #[tokio::test]
    async fn test_callback_subscription_receives_response() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], priced(1)).unwrap();
        let client = market.client().unwrap();
        let params = Params::new("bafy-x").with_piece("piece-x");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let unsubscribe = client.client.subscribe_to_responses(
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
            &params,
        );
        client.client.submit(params.clone()).await.unwrap();

        let response = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no response within window")
            .expect("callback dropped");
        assert_eq!(response.params, params);
        assert_eq!(response.provider, provider.peer_id());

        unsubscribe.unsubscribe();
        assert_eq!(client.client.subscriber_count(&params), 0);
    }

    #[tokio::test]
    async fn test_piece_cid_match_is_served() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["piece-only"], priced(2)).unwrap();
        let client = market.client().unwrap();
        let params = Params::new("unknown-payload").with_piece("piece-only");

        let response = client
            .client
            .await_response(params.clone(), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response.params, params);
        assert_eq!(response.provider, provider.peer_id());
    }

    // =============================================================================
    // MULTIPLE PROVIDERS
    // =============================================================================

    #[tokio::test]
    async fn test_two_providers_answer_independently() {
        let market = Market::new().unwrap();
        let cheap = market.provider(&["bafy-x"], priced(1)).unwrap();
        let pricey = market.provider(&["bafy-x"], priced(10)).unwrap();
        let client = market.client().unwrap();

        let responses = client
            .client
            .query(Params::new("bafy-x"), REPLY_WINDOW)
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        let identities: HashSet<PeerId> = responses.iter().map(|r| r.provider.clone()).collect();
        let expected: HashSet<PeerId> = [cheap.peer_id(), pricey.peer_id()].into_iter().collect();
        assert_eq!(identities, expected);

        let quoted: HashSet<U256> = responses.iter().map(|r| r.price_per_byte).collect();
        assert!(quoted.contains(&U256::from(1u64)));
        assert!(quoted.contains(&U256::from(10u64)));
    }

    #[tokio::test]
    async fn test_only_holders_answer() {
        let market = Market::new().unwrap();
        let holder = market.provider(&["bafy-x"], priced(1)).unwrap();
        let _other = market.provider(&["bafy-y"], priced(1)).unwrap();
        let client = market.client().unwrap();

        let responses = client
            .client
            .query(Params::new("bafy-x"), REPLY_WINDOW)
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].provider, holder.peer_id());
    }

    // =============================================================================
    // NO ANSWER
    // =============================================================================

    #[tokio::test]
    async fn test_missing_content_times_out() {
        let market = Market::new().unwrap();
        let _provider = market.provider(&["bafy-x"], priced(1)).unwrap();
        let client = market.client().unwrap();
        let params = Params::new("bafy-y");

        let result = client
            .client
            .await_response(params.clone(), Duration::from_millis(300))
            .await;

        assert!(matches!(result, Err(ClientError::Timeout(_))));
        assert_eq!(client.client.subscriber_count(&params), 0);
        assert_eq!(market.network.channels_opened(), 0);
    }

    #[tokio::test]
    async fn test_request_without_subscription_is_dropped() {
        let market = Market::new().unwrap();
        let _provider = market.provider(&["bafy-x"], priced(1)).unwrap();
        let client = market.client().unwrap();

        // Nobody subscribed; the reply arrives and is discarded
        client.client.submit(Params::new("bafy-x")).await.unwrap();

        timeout(Duration::from_secs(2), async {
            while market.network.channels_opened() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("provider never replied");
        assert_eq!(client.client.subscriber_count(&Params::new("bafy-x")), 0);
    }

    // =============================================================================
    // PROVIDER STATE
    // =============================================================================

    #[tokio::test]
    async fn test_pricing_change_reflected_in_next_response() {
        let market = Market::new().unwrap();
        let provider = market.provider(&["bafy-x"], priced(5)).unwrap();
        let client = market.client().unwrap();
        let params = Params::new("bafy-x");

        let before = client
            .client
            .await_response(params.clone(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(before.price_per_byte, U256::from(5u64));

        provider.provider.set_price_per_byte(U256::from(50u64));
        provider.provider.set_payment_interval(4096, 1024);

        let after = client
            .client
            .await_response(params, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(after.price_per_byte, U256::from(50u64));
        assert_eq!(after.payment_interval, 4096);
        assert_eq!(after.payment_interval_increase, 1024);
    }

    #[tokio::test]
    async fn test_provider_observers_see_requests() {
        let market = Market::new().unwrap();
        let provider = market.provider(&[], priced(1)).unwrap();
        let client = market.client().unwrap();
        let params = Params::new("bafy-watched");

        let (mut observed, _unsubscribe) = provider.provider.subscribe_channel(&params);
        client.client.submit(params.clone()).await.unwrap();

        let request = timeout(Duration::from_secs(2), observed.recv())
            .await
            .expect("request not observed")
            .expect("observer dropped");
        assert_eq!(request.params, params);
        let advertised: Vec<String> = client
            .transport
            .local_addresses()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(request.reply_addrs, advertised);
    }
}
