//! # Domain Entities
//!
//! Sessions, witness shares, encoded calls and transaction records.

use super::errors::{EncodingError, TxHash, Word};
use super::value_objects::{Address, AuthState, TxState};
use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Standard ECDSA signature length (r || s || v).
pub const ECDSA_SIGNATURE_LEN: usize = 65;

/// Authenticated session for one wallet address.
///
/// The pending-authentication handle lives beside this value in
/// [`crate::service::SessionAuthenticator`]; the session itself stays plain data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Address the token was issued to.
    pub address: Option<Address>,
    /// Bearer token from the redeem endpoint.
    pub bearer_token: Option<String>,
    /// Expiry, unix seconds.
    pub expiry: Option<i64>,
    /// Handshake progress.
    pub state: AuthState,
}

impl Session {
    /// Token if it was issued to `address` and has not expired at `now`.
    pub fn valid_token(&self, address: &Address, now: i64) -> Option<&str> {
        match (&self.address, &self.bearer_token, self.expiry) {
            (Some(owner), Some(token), Some(expiry)) if owner == address && now < expiry => {
                Some(token.as_str())
            }
            _ => None,
        }
    }

    /// Drop the token but keep the state machine where it is.
    pub fn clear_token(&mut self) {
        self.bearer_token = None;
        self.expiry = None;
    }
}

/// Witness server entry from the directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WitnessServer {
    /// Base URL.
    pub url: String,
}

/// One witness signature for one withdrawal attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureShare {
    /// Witness that produced it.
    pub witness: String,
    /// 65-byte ECDSA signature, hex.
    pub signature_hex: String,
    /// Expiration the witness signed over, unix seconds.
    pub expected_expiration: u64,
    /// Authorization code the witness signed over.
    pub code: String,
}

impl SignatureShare {
    /// Split into (r, s, v).
    pub fn split(&self) -> Result<(Word, Word, u8), EncodingError> {
        let digits = self
            .signature_hex
            .strip_prefix("0x")
            .unwrap_or(&self.signature_hex);
        let bytes = hex::decode(digits).map_err(|e| EncodingError::new("signature", e.to_string()))?;
        if bytes.len() != ECDSA_SIGNATURE_LEN {
            return Err(EncodingError::new(
                "signature",
                format!(
                    "expected {} bytes from {}, got {}",
                    ECDSA_SIGNATURE_LEN,
                    self.witness,
                    bytes.len()
                ),
            ));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok((r, s, bytes[64]))
    }
}

/// Outcome of a witness quorum collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuorumResult {
    /// Collected shares, in arrival order.
    pub shares: Vec<SignatureShare>,
    /// Contract minimum.
    pub min_required: usize,
    /// Collection cap.
    pub max_accepted: usize,
    /// Expiration shared by all shares of this request.
    pub expiration: u64,
    /// Code shared by all shares of this request.
    pub code: String,
}

impl QuorumResult {
    /// Usable once the contract minimum is met.
    pub fn is_usable(&self) -> bool {
        self.shares.len() >= self.min_required
    }

    /// Recovery ids and the flattened (r, s) words, in share order.
    pub fn split_signatures(&self) -> Result<(Vec<u8>, Vec<Word>), EncodingError> {
        let mut recovery_ids = Vec::with_capacity(self.shares.len());
        let mut rs = Vec::with_capacity(self.shares.len() * 2);
        for share in &self.shares {
            let (r, s, v) = share.split()?;
            recovery_ids.push(v);
            rs.push(r);
            rs.push(s);
        }
        Ok((recovery_ids, rs))
    }
}

/// ABI-encoded contract call.
///
/// Invariant: `static_words.len() * 32 + dynamic_tail.len()` is a multiple of 32.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedCall {
    /// 4-byte function selector.
    pub selector: [u8; 4],
    /// Head region: inline values and offsets.
    pub static_words: Vec<Word>,
    /// Tail region: dynamic sections.
    pub dynamic_tail: Vec<u8>,
}

impl EncodedCall {
    /// Byte length after the selector.
    pub fn len_after_selector(&self) -> usize {
        self.static_words.len() * 32 + self.dynamic_tail.len()
    }

    /// Full calldata.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.len_after_selector());
        out.extend_from_slice(&self.selector);
        for word in &self.static_words {
            out.extend_from_slice(word);
        }
        out.extend_from_slice(&self.dynamic_tail);
        out
    }

    /// 0x-prefixed calldata.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// Submitted transaction awaiting a terminal state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Hash returned by the wallet.
    pub hash: TxHash,
    /// Wall-clock submission time.
    pub submitted_at: DateTime<Utc>,
    /// Lifecycle state.
    pub state: TxState,
    /// Receipt polls performed so far.
    pub polls: u32,
}

impl PendingTransaction {
    /// Record a freshly submitted transaction.
    pub fn submitted(hash: TxHash) -> Self {
        Self {
            hash,
            submitted_at: Utc::now(),
            state: TxState::Submitted,
            polls: 0,
        }
    }
}

/// Cached balance snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceCache {
    /// Owner the amount belongs to.
    pub owner: Address,
    /// Balance in base units.
    pub amount: U256,
    /// Capture time.
    pub captured_at: Instant,
}

impl BalanceCache {
    /// Fresh if younger than `ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.captured_at) < ttl
    }
}

/// Transaction handed to the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Sender.
    pub from: Address,
    /// Target contract.
    pub to: Address,
    /// 0x-prefixed calldata.
    pub data: String,
    /// Gas limit, if fixed by the caller.
    pub gas_limit: Option<u64>,
    /// Native value in wei.
    pub value: U256,
}

/// Read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Caller, if relevant.
    pub from: Option<Address>,
    /// Target contract.
    pub to: Address,
    /// 0x-prefixed calldata.
    pub data: String,
}

/// Mined transaction receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// `true` when execution succeeded.
    pub status: bool,
    /// Inclusion block.
    pub block_number: Option<u64>,
    /// Revert reason, when the node reports one.
    pub revert_reason: Option<String>,
}

/// Witness request payload, shared by every witness of one attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessRequest {
    /// Withdrawing user.
    pub user_address: Address,
    /// Withdrawal contract.
    pub contract_address: Address,
    /// Amount in base units, decimal string.
    pub amount: String,
    /// Unix seconds after which the authorization is void.
    pub expiration: u64,
}

/// Terminal success of [`crate::service::TransactionExecutor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    /// Transaction record in its terminal state.
    pub transaction: PendingTransaction,
    /// Receipt that confirmed it.
    pub receipt: TxReceipt,
}

/// Result of a completed withdrawal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    /// Amount withdrawn, base units.
    pub amount: U256,
    /// Witness signatures used.
    pub signature_count: usize,
    /// Confirmed transaction.
    pub confirmed: ConfirmedTransaction,
}
