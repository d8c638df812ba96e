//! # Inbound Ports
//!
//! API trait defining what the bridge withdrawal subsystem can do.

use crate::domain::{
    Address, BridgeError, ConfirmedTransaction, ConnectionAction, TokenInfo, WithdrawalReceipt,
};
use async_trait::async_trait;
use primitive_types::U256;

/// Bridge withdrawal API - inbound port.
///
/// Amounts are decimal strings in token units; conversion to base units uses
/// the token's declared decimals.
#[async_trait]
pub trait WithdrawalApi: Send + Sync {
    /// Authenticate the current wallet address; returns the bearer token.
    async fn login(&self) -> Result<String, BridgeError>;

    /// Drop the session and its persisted token.
    async fn logout(&self) -> Result<(), BridgeError>;

    /// Collect a witness quorum and withdraw `amount` of the withdrawal token.
    async fn withdraw(&self, amount: &str) -> Result<WithdrawalReceipt, BridgeError>;

    /// Withdrawal-token balance of the current address, in base units.
    async fn balance(&self) -> Result<U256, BridgeError>;

    /// Approve `spender` for `amount` unless the allowance already covers it.
    async fn approve_if_needed(
        &self,
        token: TokenInfo,
        spender: &Address,
        amount: &str,
    ) -> Result<Option<ConfirmedTransaction>, BridgeError>;

    /// Send `amount` of `token` to `destination` on `chain`.
    async fn cross_chain_transfer(
        &self,
        destination: &Address,
        token: TokenInfo,
        amount: &str,
        chain: &str,
    ) -> Result<ConfirmedTransaction, BridgeError>;

    /// Drive the connection lifecycle contract.
    async fn connection_action(
        &self,
        action: ConnectionAction,
        peer: Option<Address>,
    ) -> Result<ConfirmedTransaction, BridgeError>;
}
