//! # Domain Errors
//!
//! Error taxonomy for the bridge withdrawal subsystem.
//!
//! Every error is tagged with a [`FailureKind`] where it is created, so
//! retry decisions never depend on message text.

use thiserror::Error;

/// A single 32-byte ABI word.
pub type Word = [u8; 32];

/// Transaction hash as returned by the wallet (0x-prefixed hex).
pub type TxHash = String;

/// Whether a failure may succeed if the operation is repeated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeout, busy peer, user cancelled a prompt, signer still booting.
    Transient,
    /// Repeating the same input will fail the same way.
    Terminal,
}

/// Malformed or out-of-range encoding input. Never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Encoding error in `{field}`: {reason}")]
pub struct EncodingError {
    /// Name of the offending field.
    pub field: String,
    /// What was wrong with it.
    pub reason: String,
}

impl EncodingError {
    /// Create an encoding error for a named field.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure categories reported by a wallet signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerErrorKind {
    /// Secure context not initialised yet (embedded wallets boot asynchronously).
    NotReady,
    /// The user cancelled or denied the wallet prompt.
    UserRejected,
    /// The wallet did not answer in time.
    Timeout,
    /// The wallet could not reach its node.
    Network,
    /// The node answered with an error.
    Rpc,
}

/// Error raised by a [`crate::ports::WalletSigner`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct SignerError {
    /// Category assigned by the signer adapter.
    pub kind: SignerErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl SignerError {
    /// Create a signer error.
    pub fn new(kind: SignerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Signer has not finished initialising.
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(SignerErrorKind::NotReady, message)
    }

    /// User dismissed the prompt.
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(SignerErrorKind::UserRejected, message)
    }

    /// Failure kind of this signer error.
    pub fn kind(&self) -> FailureKind {
        match self.kind {
            SignerErrorKind::Rpc => FailureKind::Terminal,
            _ => FailureKind::Transient,
        }
    }
}

/// Failure categories reported by an HTTP transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request exceeded its deadline.
    Timeout,
    /// Connection could not be established.
    Connect,
    /// Body could not be decoded.
    Decode,
    /// Server answered 5xx.
    ServerError,
    /// Server refused the request (non-retryable status).
    Rejected,
    /// Anything else.
    Other,
}

/// Error raised by a [`crate::ports::HttpTransport`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    /// Category assigned by the transport adapter.
    pub kind: TransportErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure kind of this transport error.
    pub fn kind(&self) -> FailureKind {
        match self.kind {
            TransportErrorKind::Timeout
            | TransportErrorKind::Connect
            | TransportErrorKind::ServerError => FailureKind::Transient,
            TransportErrorKind::Decode | TransportErrorKind::Rejected | TransportErrorKind::Other => {
                FailureKind::Terminal
            }
        }
    }
}

/// Error raised by a [`crate::ports::KeyValueStore`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Storage error: {0}")]
pub struct StorageError(pub String);

/// Subsystem error.
#[derive(Clone, Debug, Error)]
pub enum BridgeError {
    /// Malformed encoding input.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Challenge or redeem failed.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Detail from the auth server or signer.
        message: String,
        /// Assigned at the failure site.
        kind: FailureKind,
    },

    /// Fewer witness signatures than the contract requires.
    #[error(
        "Insufficient witness signatures: got {got}, need {required}. \
         Wait for the current signing window to close and try again."
    )]
    InsufficientQuorum {
        /// Signatures collected.
        got: usize,
        /// Signatures required.
        required: usize,
    },

    /// User cancelled the transaction in the wallet.
    #[error("Transaction rejected in wallet: {0}")]
    TransactionRejected(String),

    /// Transaction was mined and failed.
    #[error("Transaction {hash} reverted: {reason}")]
    TransactionReverted {
        /// Transaction hash.
        hash: TxHash,
        /// Revert reason reported by the chain.
        reason: String,
    },

    /// No receipt within the polling window.
    #[error("Transaction {hash} not confirmed after {polls} polls; it may still be pending")]
    TransactionTimeout {
        /// Transaction hash.
        hash: TxHash,
        /// Receipt polls performed.
        polls: u32,
    },

    /// Wallet capability failure.
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    /// HTTP transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Key-value store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Illegal state machine transition.
    #[error("Invalid {machine} transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Which state machine.
        machine: &'static str,
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },
}

impl BridgeError {
    /// Authentication failure with an explicit kind.
    pub fn authentication(message: impl Into<String>, kind: FailureKind) -> Self {
        Self::Authentication {
            message: message.into(),
            kind,
        }
    }

    /// Failure kind used by retry loops.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication { kind, .. } => *kind,
            Self::Signer(e) => e.kind(),
            Self::Transport(e) => e.kind(),
            Self::InsufficientQuorum { .. } | Self::TransactionTimeout { .. } => {
                FailureKind::Transient
            }
            Self::Encoding(_)
            | Self::TransactionRejected(_)
            | Self::TransactionReverted { .. }
            | Self::Storage(_)
            | Self::Config(_)
            | Self::InvalidStateTransition { .. } => FailureKind::Terminal,
        }
    }

    /// Shorthand for `kind() == Transient`.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}
