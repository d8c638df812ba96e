//! # Withdrawal Flow
//!
//! SessionAuthenticator → QuorumCollector → encode_withdraw → TransactionExecutor,
//! driven through the public `WithdrawalApi`.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{mined, FakeBridge, Harness, CODE, USER, WITHDRAWAL_CONTRACT, WITHDRAWAL_TOKEN};
    use primitive_types::U256;
    use qc_18_bridge_withdrawal::algorithms::abi::{decode_hex, read_word};
    use qc_18_bridge_withdrawal::algorithms::encode_bytes32_from_text;
    use qc_18_bridge_withdrawal::{
        selector, BridgeError, SignerError, TxReceipt, TxState, WithdrawalApi,
    };
    use tokio::time::Instant;

    const WITHDRAW_SIG: &str =
        "withdraw(address,address,uint256,uint256,bytes32,uint8[],bytes32[])";

    #[tokio::test(start_paused = true)]
    async fn test_full_withdrawal() {
        let harness = Harness::new(FakeBridge::with_healthy(20, 0));
        harness.wallet.push_receipt(Ok(None));
        harness.wallet.push_receipt(Ok(Some(mined("0x01"))));

        let receipt = harness.service.withdraw("2.25").await.unwrap();

        assert_eq!(receipt.amount, U256::from(2_250_000u64));
        assert_eq!(receipt.signature_count, 20);
        assert_eq!(receipt.confirmed.transaction.state, TxState::ConfirmedSuccess);
        assert_eq!(receipt.confirmed.transaction.polls, 2);
        assert_eq!(harness.bridge.challenges(), 1);
        assert_eq!(harness.bridge.directory_fetches(), 1);

        let submitted = harness.wallet.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].from, USER);
        assert_eq!(submitted[0].to, WITHDRAWAL_CONTRACT);

        let data = decode_hex("data", &submitted[0].data).unwrap();
        assert_eq!(data[..4], selector(WITHDRAW_SIG));
        let args = &data[4..];
        assert_eq!(args.len() % 32, 0);
        assert_eq!(args.len(), (7 + 21 + 41) * 32);

        assert_eq!(read_word(args, 0).unwrap()[12..], WITHDRAWAL_TOKEN.as_bytes()[..]);
        assert_eq!(read_word(args, 32).unwrap()[12..], USER.as_bytes()[..]);
        assert_eq!(
            U256::from_big_endian(&read_word(args, 64).unwrap()),
            U256::from(2_250_000u64)
        );
        assert_eq!(read_word(args, 128).unwrap(), encode_bytes32_from_text(CODE));
        assert_eq!(U256::from_big_endian(&read_word(args, 160).unwrap()), U256::from(7 * 32));
        assert_eq!(
            U256::from_big_endian(&read_word(args, 192).unwrap()),
            U256::from((7 + 21) * 32)
        );
        // Recovery-id array length.
        assert_eq!(U256::from_big_endian(&read_word(args, 224).unwrap()), U256::from(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_withdrawal_reuses_session() {
        let harness = Harness::new(FakeBridge::with_healthy(18, 0));
        harness.wallet.push_receipt(Ok(Some(mined("0x01"))));
        harness.wallet.push_receipt(Ok(Some(mined("0x02"))));

        harness.service.withdraw("1").await.unwrap();
        harness.service.withdraw("1").await.unwrap();

        assert_eq!(harness.bridge.challenges(), 1);
        assert_eq!(harness.bridge.directory_fetches(), 2);
        assert_eq!(harness.wallet.signature_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_withdrawal() {
        let harness = Harness::new(FakeBridge::with_healthy(18, 0));
        harness.wallet.push_receipt(Ok(Some(TxReceipt {
            transaction_hash: "0x01".into(),
            status: false,
            block_number: Some(5),
            revert_reason: Some("authorization expired".into()),
        })));

        let err = harness.service.withdraw("1").await.unwrap_err();
        match err {
            BridgeError::TransactionReverted { reason, .. } => {
                assert_eq!(reason, "authorization expired")
            }
            other => panic!("expected revert, got {:?}", other),
        }
        assert_eq!(harness.wallet.poll_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_withdrawal_times_out() {
        let harness = Harness::new(FakeBridge::with_healthy(18, 0));
        let started = Instant::now();

        let err = harness.service.withdraw("1").await.unwrap_err();

        assert!(matches!(err, BridgeError::TransactionTimeout { polls: 60, .. }));
        assert!(err.to_string().contains("may still be pending"));
        assert_eq!(harness.wallet.poll_count(), 60);
        assert!(started.elapsed() >= std::time::Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_rejection() {
        let harness = Harness::new(FakeBridge::with_healthy(18, 0));
        harness
            .wallet
            .push_transaction(Err(SignerError::user_rejected("User denied transaction")));

        let err = harness.service.withdraw("1").await.unwrap_err();

        assert!(matches!(err, BridgeError::TransactionRejected(_)));
        assert_eq!(harness.wallet.poll_count(), 0);
    }
}
