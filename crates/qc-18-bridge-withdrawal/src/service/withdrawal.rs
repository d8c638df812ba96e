//! # Withdrawal Service
//!
//! Wires the components into the [`WithdrawalApi`]:
//!
//! ```text
//! SessionAuthenticator -> QuorumCollector -> encode_withdraw -> TransactionExecutor
//! ```

use super::balance::BalanceReader;
use super::executor::TransactionExecutor;
use super::quorum::QuorumCollector;
use super::session::SessionAuthenticator;
use crate::algorithms::{
    decode_allowance, encode_connection, encode_cross_chain_transfer, encode_withdraw,
    erc20_allowance, erc20_approve, to_base_units, WithdrawCall,
};
use crate::domain::{
    invariant_quorum_met, Address, BridgeConfig, BridgeError, CallRequest, ConfirmedTransaction,
    ConnectionAction, EncodingError, TokenInfo, WithdrawalReceipt,
};
use crate::ports::inbound::WithdrawalApi;
use crate::ports::outbound::{HttpTransport, KeyValueStore, WalletSigner};
use async_trait::async_trait;
use primitive_types::U256;
use std::sync::Arc;
use tracing::{debug, info};

/// Bridge withdrawal service.
pub struct WithdrawalService {
    config: BridgeConfig,
    signer: Arc<dyn WalletSigner>,
    auth: SessionAuthenticator,
    quorum: QuorumCollector,
    executor: TransactionExecutor,
    balance: BalanceReader,
}

impl WithdrawalService {
    /// Validate `config` and build the service.
    pub fn new(
        config: BridgeConfig,
        signer: Arc<dyn WalletSigner>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let auth = SessionAuthenticator::new(config.clone(), transport.clone(), store);
        let quorum = QuorumCollector::new(config.clone(), transport, auth.clone());
        let executor = TransactionExecutor::new(signer.clone(), config.executor.clone());
        let balance = BalanceReader::new(
            signer.clone(),
            config.contracts.withdrawal_token,
            config.cache.balance_ttl,
        );
        Ok(Self {
            config,
            signer,
            auth,
            quorum,
            executor,
            balance,
        })
    }

    /// Session authenticator shared by this service.
    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.auth
    }

    /// The wallet switched to `address`; drop everything keyed by the old one.
    pub fn on_address_changed(&self, address: &Address) -> Result<(), BridgeError> {
        self.auth.on_address_changed(address)?;
        self.balance.invalidate();
        Ok(())
    }

    /// Current wallet address, invalidating state left by a previous account.
    async fn current_address(&self) -> Result<Address, BridgeError> {
        let address = self.signer.address().await?;
        if let Some(previous) = self.auth.session().address {
            if previous != address {
                self.on_address_changed(&address)?;
            }
        }
        Ok(address)
    }

    fn contract(&self, name: &str, address: Address) -> Result<Address, BridgeError> {
        if address.is_zero() {
            return Err(BridgeError::Config(format!("{} is not configured", name)));
        }
        Ok(address)
    }
}

fn positive_amount(amount: &str, decimals: u8) -> Result<U256, BridgeError> {
    let base = to_base_units(amount, decimals)?;
    if base.is_zero() {
        return Err(EncodingError::new("amount", "must be greater than zero").into());
    }
    Ok(base)
}

#[async_trait]
impl WithdrawalApi for WithdrawalService {
    async fn login(&self) -> Result<String, BridgeError> {
        self.current_address().await?;
        self.auth.authenticate_with_retry(self.signer.clone()).await
    }

    async fn logout(&self) -> Result<(), BridgeError> {
        self.auth.logout()?;
        self.balance.invalidate();
        Ok(())
    }

    async fn withdraw(&self, amount: &str) -> Result<WithdrawalReceipt, BridgeError> {
        let contracts = &self.config.contracts;
        let contract = self.contract("withdrawal_contract", contracts.withdrawal_contract)?;
        let token = self.contract("withdrawal_token", contracts.withdrawal_token)?;
        let base = positive_amount(amount, contracts.token_decimals)?;
        let user = self.current_address().await?;
        info!(user = %user, amount = %base, "[qc-18] Starting withdrawal");

        let quorum = self.quorum.collect(self.signer.clone(), &user, base).await?;
        invariant_quorum_met(&quorum)?;

        let call = encode_withdraw(&WithdrawCall::from_quorum(token, user, base, &quorum)?)?;
        debug!(
            signatures = quorum.shares.len(),
            calldata_len = call.len_after_selector() + 4,
            "[qc-18] Withdrawal call encoded"
        );

        let confirmed = self
            .executor
            .submit_and_confirm(&call, user, contract, self.config.executor.gas_limit)
            .await?;
        self.balance.invalidate();

        info!(
            user = %user,
            tx_hash = %confirmed.transaction.hash,
            "[qc-18] Withdrawal confirmed"
        );
        Ok(WithdrawalReceipt {
            amount: base,
            signature_count: quorum.shares.len(),
            confirmed,
        })
    }

    async fn balance(&self) -> Result<U256, BridgeError> {
        self.contract("withdrawal_token", self.config.contracts.withdrawal_token)?;
        let owner = self.current_address().await?;
        self.balance.balance(&owner).await
    }

    async fn approve_if_needed(
        &self,
        token: TokenInfo,
        spender: &Address,
        amount: &str,
    ) -> Result<Option<ConfirmedTransaction>, BridgeError> {
        let required = positive_amount(amount, token.decimals)?;
        let owner = self.current_address().await?;

        let result = self
            .signer
            .call(CallRequest {
                from: Some(owner),
                to: token.address,
                data: erc20_allowance(&owner, spender).to_hex(),
            })
            .await?;
        let allowance = decode_allowance(&result)?;
        if allowance >= required {
            debug!(spender = %spender, %allowance, "[qc-18] Allowance already sufficient");
            return Ok(None);
        }

        info!(spender = %spender, %allowance, %required, "[qc-18] Approving spender");
        let call = erc20_approve(spender, required)?;
        let confirmed = self
            .executor
            .submit_and_confirm(&call, owner, token.address, None)
            .await?;
        Ok(Some(confirmed))
    }

    async fn cross_chain_transfer(
        &self,
        destination: &Address,
        token: TokenInfo,
        amount: &str,
        chain: &str,
    ) -> Result<ConfirmedTransaction, BridgeError> {
        let bridge = self.contract("cross_chain_bridge", self.config.contracts.cross_chain_bridge)?;
        let base = positive_amount(amount, token.decimals)?;
        let call = encode_cross_chain_transfer(destination, &token.address, base, chain)?;

        self.approve_if_needed(token, &bridge, amount).await?;
        let owner = self.current_address().await?;
        info!(destination = %destination, chain, amount = %base, "[qc-18] Cross-chain transfer");
        self.executor
            .submit_and_confirm(&call, owner, bridge, None)
            .await
    }

    async fn connection_action(
        &self,
        action: ConnectionAction,
        peer: Option<Address>,
    ) -> Result<ConfirmedTransaction, BridgeError> {
        let contract = self.contract("connection_contract", self.config.contracts.connection_contract)?;
        let call = encode_connection(action, peer.as_ref())?;
        let owner = self.current_address().await?;
        info!(action = ?action, "[qc-18] Connection action");
        self.executor
            .submit_and_confirm(&call, owner, contract, None)
            .await
    }
}
