//! # Transaction Executor
//!
//! Submits encoded calls through the wallet and polls for a terminal receipt.
//!
//! ```text
//! BUILT -> SUBMITTED -> CONFIRMED_SUCCESS
//!                    -> CONFIRMED_REVERTED   (TransactionReverted)
//!                    -> TIMED_OUT            (TransactionTimeout)
//! ```
//!
//! A wallet-level rejection never reaches SUBMITTED and is reported as
//! `TransactionRejected`.

use crate::domain::{
    Address, BridgeError, ConfirmedTransaction, EncodedCall, ExecutorConfig, PendingTransaction,
    SignerErrorKind, TransactionRequest, TxState,
};
use crate::ports::outbound::WalletSigner;
use bridge_telemetry::{
    log_tx_event, metric_inc, metric_observe, CONFIRMATION_DURATION, TRANSACTIONS,
};
use primitive_types::U256;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Submit-and-confirm driver.
pub struct TransactionExecutor {
    signer: Arc<dyn WalletSigner>,
    config: ExecutorConfig,
}

impl TransactionExecutor {
    /// Create an executor using `signer` for submission and receipts.
    pub fn new(signer: Arc<dyn WalletSigner>, config: ExecutorConfig) -> Self {
        Self { signer, config }
    }

    /// Submit `call` to `to` and wait for a terminal state.
    pub async fn submit_and_confirm(
        &self,
        call: &EncodedCall,
        from: Address,
        to: Address,
        gas_limit: Option<u64>,
    ) -> Result<ConfirmedTransaction, BridgeError> {
        let pending = self
            .submit(TransactionRequest {
                from,
                to,
                data: call.to_hex(),
                gas_limit,
                value: U256::zero(),
            })
            .await?;
        self.confirm(pending).await
    }

    /// Hand `request` to the wallet.
    pub async fn submit(&self, request: TransactionRequest) -> Result<PendingTransaction, BridgeError> {
        let to = request.to;
        let hash = match self.signer.request_transaction(request).await {
            Ok(hash) => hash,
            Err(e) if e.kind == SignerErrorKind::UserRejected => {
                metric_inc!(TRANSACTIONS, &["rejected"]);
                info!(to = %to, "[qc-18] Transaction rejected in wallet");
                return Err(BridgeError::TransactionRejected(e.message));
            }
            Err(e) => return Err(e.into()),
        };

        log_tx_event!(info, "[qc-18] Transaction submitted", hash, to = %to);
        Ok(PendingTransaction::submitted(hash))
    }

    /// Poll until `pending` reaches a terminal state.
    ///
    /// Each poll waits `poll_interval` first. Receipt lookup errors count as
    /// "not mined yet".
    pub async fn confirm(
        &self,
        mut pending: PendingTransaction,
    ) -> Result<ConfirmedTransaction, BridgeError> {
        let started = Instant::now();

        for poll in 1..=self.config.max_polls {
            sleep(self.config.poll_interval).await;
            pending.polls = poll;

            let receipt = match self.signer.get_receipt(&pending.hash).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => continue,
                Err(e) => {
                    debug!(tx_hash = %pending.hash, poll, error = %e, "[qc-18] Receipt lookup failed");
                    continue;
                }
            };

            let next = if receipt.status {
                TxState::ConfirmedSuccess
            } else {
                TxState::ConfirmedReverted
            };
            self.advance(&mut pending, next)?;
            metric_observe!(CONFIRMATION_DURATION, started.elapsed().as_secs_f64());

            if next == TxState::ConfirmedReverted {
                let reason = receipt
                    .revert_reason
                    .clone()
                    .unwrap_or_else(|| "execution reverted".to_string());
                log_tx_event!(warn, "[qc-18] Transaction reverted", pending.hash, reason = %reason, poll);
                return Err(BridgeError::TransactionReverted {
                    hash: pending.hash,
                    reason,
                });
            }

            log_tx_event!(
                info,
                "[qc-18] Transaction confirmed",
                pending.hash,
                poll,
                block = ?receipt.block_number
            );
            return Ok(ConfirmedTransaction {
                transaction: pending,
                receipt,
            });
        }

        self.advance(&mut pending, TxState::TimedOut)?;
        log_tx_event!(warn, "[qc-18] Transaction not confirmed in time", pending.hash, polls = pending.polls);
        Err(BridgeError::TransactionTimeout {
            hash: pending.hash,
            polls: pending.polls,
        })
    }

    fn advance(&self, pending: &mut PendingTransaction, next: TxState) -> Result<(), BridgeError> {
        if !pending.state.can_transition_to(next) {
            return Err(invalid(pending.state, next));
        }
        pending.state = next;
        metric_inc!(TRANSACTIONS, &[next.label()]);
        Ok(())
    }
}

fn invalid(from: TxState, to: TxState) -> BridgeError {
    BridgeError::InvalidStateTransition {
        machine: "transaction",
        from: from.label().to_string(),
        to: to.label().to_string(),
    }
}
