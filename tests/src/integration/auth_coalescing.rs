//! # Authentication Coalescing
//!
//! Concurrent logins share one challenge/redeem round-trip; sessions survive
//! a restart through the key-value store.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{FakeBridge, Harness, USER};
    use tokio::time::Instant;
    use qc_18_bridge_withdrawal::service::{KEY_ADDRESS, KEY_DEVICE_ID, KEY_TOKEN};
    use qc_18_bridge_withdrawal::{
        Address, AuthState, InMemoryKeyValueStore, KeyValueStore, MockWalletSigner, SignerError,
        WalletSigner, WithdrawalApi,
    };
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_logins_share_one_round_trip() {
        let harness = Harness::new(FakeBridge::with_healthy(0, 0).with_latency(Duration::from_millis(300)));
        let auth = harness.service.authenticator();
        let wallet: Arc<dyn WalletSigner> = harness.wallet.clone();

        let (a, b, c) = tokio::join!(
            auth.authenticate(wallet.clone()),
            auth.authenticate(wallet.clone()),
            auth.authenticate(wallet.clone()),
        );

        assert_eq!(a.unwrap(), "token-1");
        assert_eq!(b.unwrap(), "token-1");
        assert_eq!(c.unwrap(), "token-1");
        assert_eq!(harness.bridge.challenges(), 1);
        assert_eq!(harness.bridge.redeems(), 1);
        assert_eq!(harness.wallet.signature_count(), 1);
        assert_eq!(auth.state(), AuthState::Authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_wallet_prompts_once() {
        let harness = Harness::with_wallet(
            FakeBridge::with_healthy(0, 0),
            MockWalletSigner::new(USER).with_sign_delay(Duration::from_secs(5)),
            Arc::new(InMemoryKeyValueStore::new()),
        );
        let started = Instant::now();

        let (a, b) = tokio::join!(harness.service.login(), harness.service.login());

        assert_eq!(a.unwrap(), "token-1");
        assert_eq!(b.unwrap(), "token-1");
        assert_eq!(harness.wallet.signature_count(), 1);
        assert_eq!(harness.bridge.challenges(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_callers_share_failure() {
        let harness = Harness::new(FakeBridge::with_healthy(0, 0).with_latency(Duration::from_millis(300)));
        harness
            .wallet
            .push_signature(Err(SignerError::user_rejected("dismissed")));
        let auth = harness.service.authenticator();
        let wallet: Arc<dyn WalletSigner> = harness.wallet.clone();

        let (a, b) = tokio::join!(auth.authenticate(wallet.clone()), auth.authenticate(wallet.clone()));

        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(harness.bridge.challenges(), 1);
        assert!(matches!(auth.state(), AuthState::Failed(_)));

        // The failure is not cached.
        assert_eq!(auth.authenticate(wallet).await.unwrap(), "token-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_survives_restart() {
        let first = Harness::new(FakeBridge::with_healthy(0, 0));
        first.service.login().await.unwrap();
        assert_eq!(first.store.get(KEY_TOKEN).unwrap().as_deref(), Some("token-1"));
        assert_eq!(first.store.get(KEY_ADDRESS).unwrap(), Some(USER.to_hex()));

        let second = Harness::with_store(FakeBridge::with_healthy(0, 0), first.store.clone());
        let token = second.service.login().await.unwrap();

        assert_eq!(token, "token-1");
        assert_eq!(second.bridge.challenges(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_switch_reauthenticates() {
        let harness = Harness::new(FakeBridge::with_healthy(0, 0));
        harness.service.login().await.unwrap();

        let other = Address::from_bytes([0x22; 20]);
        harness.wallet.set_address(other);
        let token = harness.service.login().await.unwrap();

        assert_eq!(token, "token-2");
        assert_eq!(harness.bridge.challenges(), 2);
        assert_eq!(harness.store.get(KEY_ADDRESS).unwrap(), Some(other.to_hex()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_forgets_session() {
        let harness = Harness::new(FakeBridge::with_healthy(0, 0));
        harness.service.login().await.unwrap();
        harness.service.logout().await.unwrap();

        assert_eq!(harness.store.get(KEY_TOKEN).unwrap(), None);
        assert_eq!(harness.store.get(KEY_ADDRESS).unwrap(), None);
        assert!(harness.store.get(KEY_DEVICE_ID).unwrap().is_some());
        harness.service.login().await.unwrap();
        assert_eq!(harness.bridge.challenges(), 2);
    }
}
