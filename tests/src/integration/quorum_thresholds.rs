//! # Quorum Thresholds
//!
//! Minimum 18, maximum 20 witness signatures; per-witness retry ceiling of
//! two extra attempts.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{bridge_config, FakeBridge, Harness, Witness, USER};
    use primitive_types::U256;
    use qc_18_bridge_withdrawal::{
        BridgeError, InMemoryKeyValueStore, MockWalletSigner, QuorumCollector, QuorumResult,
        SessionAuthenticator, WithdrawalApi,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn collector(bridge: Arc<FakeBridge>) -> QuorumCollector {
        let config = bridge_config();
        let auth = SessionAuthenticator::new(
            config.clone(),
            bridge.clone(),
            Arc::new(InMemoryKeyValueStore::new()),
        );
        QuorumCollector::new(config, bridge, auth)
    }

    async fn collect(bridge: Arc<FakeBridge>) -> Result<QuorumResult, BridgeError> {
        collector(bridge)
            .collect(Arc::new(MockWalletSigner::new(USER)), &USER, U256::from(1_000_000u64))
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_seventeen_is_insufficient() {
        let bridge = Arc::new(FakeBridge::with_healthy(17, 5));
        let err = collect(bridge).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InsufficientQuorum {
                got: 17,
                required: 18
            }
        ));
        assert!(err.to_string().contains("try again"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eighteen_is_enough() {
        let bridge = Arc::new(FakeBridge::with_healthy(18, 0));
        let result = collect(bridge).await.unwrap();
        assert_eq!(result.shares.len(), 18);
        assert!(result.is_usable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_twenty_five_capped_at_twenty() {
        let bridge = Arc::new(FakeBridge::with_healthy(25, 0));
        let result = collect(bridge).await.unwrap();
        assert_eq!(result.shares.len(), 20);
        assert_eq!(result.max_accepted, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shares_agree_on_expiration_and_code() {
        let bridge = Arc::new(FakeBridge::with_healthy(20, 0));
        let result = collect(bridge).await.unwrap();
        assert!(qc_18_bridge_withdrawal::domain::invariant_shares_agree(&result));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_twice_then_accepted() {
        let mut witnesses = vec![Witness::Busy(2)];
        witnesses.extend(vec![Witness::Healthy; 17]);
        let bridge = Arc::new(FakeBridge::new(witnesses));
        let started = Instant::now();

        let result = collect(bridge.clone()).await.unwrap();

        assert_eq!(result.shares.len(), 18);
        assert_eq!(bridge.attempts(0), 3);
        // Backoff 1 x 2s then 2 x 2s.
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_three_times_is_a_peer_failure() {
        let mut witnesses = vec![Witness::Busy(3)];
        witnesses.extend(vec![Witness::Healthy; 17]);
        let bridge = Arc::new(FakeBridge::new(witnesses));

        let err = collect(bridge.clone()).await.unwrap_err();

        assert!(matches!(err, BridgeError::InsufficientQuorum { got: 17, .. }));
        assert_eq!(bridge.attempts(0), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_peers_are_tolerated() {
        let mut witnesses = vec![Witness::Down, Witness::Unauthenticated];
        witnesses.extend(vec![Witness::Healthy; 18]);
        let bridge = Arc::new(FakeBridge::new(witnesses));

        let result = collect(bridge.clone()).await.unwrap();

        assert_eq!(result.shares.len(), 18);
        assert_eq!(bridge.attempts(0), 3);
        assert_eq!(bridge.attempts(1), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_witnesses_overlap() {
        let bridge = Arc::new(FakeBridge::with_healthy(20, 0).with_latency(Duration::from_secs(1)));
        let started = Instant::now();
        collect(bridge).await.unwrap();
        // challenge + redeem + directory + one parallel round of witnesses.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_quorum_submits_nothing() {
        let harness = Harness::new(FakeBridge::with_healthy(17, 3));
        let err = harness.service.withdraw("1").await.unwrap_err();
        assert!(err.is_transient());
        assert!(harness.wallet.submitted.lock().is_empty());
    }
}
