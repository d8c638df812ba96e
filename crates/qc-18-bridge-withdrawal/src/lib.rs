//! # QC-18 Bridge Withdrawal
//!
//! Transaction construction and witness-quorum authorization for bridge
//! withdrawals.
//!
//! **Subsystem ID:** 18  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Move funds out of the bridge contract on behalf of a wallet:
//! - Hand-written ABI encoding for a fixed catalog of contract calls
//! - Challenge/redeem session authentication against the bridge API
//! - Concurrent collection of witness signatures up to a quorum
//! - Submission and receipt polling with success / revert / timeout outcomes
//!
//! ## Withdrawal Flow
//!
//! ```text
//! SessionAuthenticator ──token──→ QuorumCollector ──shares──→ encode_withdraw
//!                                                                  │
//!                                   TransactionExecutor ←─calldata─┘
//! ```
//!
//! ## Thresholds
//!
//! | Parameter | Default |
//! |-----------|---------|
//! | Minimum witness signatures | 18 |
//! | Maximum accepted | 20 |
//! | Witness retries | 2 (backoff attempt × 2s) |
//! | Receipt polling | every 2s, 60 polls |
//! | Session validity | 24h |
//!
//! ## Module Structure
//!
//! ```text
//! qc-18-bridge-withdrawal/
//! ├── domain/          # Address, Session, QuorumResult, config, errors
//! ├── algorithms/      # ABI codec, contract calls, units, signature format, retry
//! ├── ports/           # WithdrawalApi, WalletSigner, HttpTransport, KeyValueStore
//! ├── adapters/        # reqwest transport, JSON-RPC wallet, key-value stores
//! └── service/         # Session, quorum, executor, balance, withdrawal
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{InMemoryKeyValueStore, JsonFileKeyValueStore, JsonRpcWalletSigner, ReqwestTransport};
pub use algorithms::{
    encode_withdraw, from_base_units, resolve_signature, selector, to_base_units, WithdrawCall,
};
pub use domain::{
    Address, AuthState, BridgeConfig, BridgeError, ConfigError, ConfirmedTransaction,
    ConnectionAction, EncodedCall, EncodingError, FailureKind, QuorumResult, Session,
    SignatureShare, SignerError, SignerErrorKind, TokenInfo, TransportError, TransportErrorKind,
    TxReceipt, TxState, WithdrawalReceipt,
};
pub use ports::{
    HttpTransport, KeyValueStore, MockWalletSigner, ScriptedTransport, WalletSigner, WithdrawalApi,
};
pub use service::{
    BalanceReader, QuorumCollector, SessionAuthenticator, TransactionExecutor, WithdrawalService,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
