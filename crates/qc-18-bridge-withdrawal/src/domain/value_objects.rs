//! # Domain Value Objects
//!
//! Immutable value types for the bridge withdrawal subsystem.

use super::errors::EncodingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 20-byte account or contract address.
///
/// Always rendered as lowercase 0x-prefixed hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse a 0x-prefixed (or bare) 40-digit hex address.
    pub fn parse(value: &str) -> Result<Self, EncodingError> {
        Self::parse_field("address", value)
    }

    /// Parse, naming `field` in the error.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, EncodingError> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 40 {
            return Err(EncodingError::new(
                field,
                format!("expected 40 hex digits, got {}", digits.len()),
            ));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| EncodingError::new(field, e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase 0x-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Check for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_hex()
    }
}

/// Authentication state machine.
///
/// ```text
/// UNAUTHENTICATED -> CHALLENGE_REQUESTED -> SIGNING -> REDEEMING -> AUTHENTICATED
///        ^                 |                  |           |
///        +----- any -------+------ FAILED(reason) --------+
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    /// No token.
    #[default]
    Unauthenticated,
    /// Challenge requested from the auth server.
    ChallengeRequested,
    /// Waiting for the wallet to sign the challenge.
    Signing,
    /// Exchanging the signature for a bearer token.
    Redeeming,
    /// Holding a valid bearer token.
    Authenticated,
    /// Last attempt failed.
    Failed(String),
}

impl AuthState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: &AuthState) -> bool {
        match (self, next) {
            (_, Self::Unauthenticated) => true,
            (Self::Unauthenticated, Self::ChallengeRequested)
            | (Self::Authenticated, Self::ChallengeRequested)
            | (Self::Failed(_), Self::ChallengeRequested) => true,
            (Self::ChallengeRequested, Self::Signing) => true,
            (Self::Signing, Self::Redeeming) => true,
            (Self::Redeeming, Self::Authenticated) => true,
            (Self::ChallengeRequested | Self::Signing | Self::Redeeming, Self::Failed(_)) => true,
            _ => false,
        }
    }

    /// Handshake is between challenge and token.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::ChallengeRequested | Self::Signing | Self::Redeeming
        )
    }
}

/// Transaction lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    /// Calldata assembled, not yet handed to the wallet.
    #[default]
    Built,
    /// Wallet returned a hash.
    Submitted,
    /// Receipt with success status.
    ConfirmedSuccess,
    /// Receipt with failing status.
    ConfirmedReverted,
    /// Polling window exhausted without a receipt.
    TimedOut,
}

impl TxState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: TxState) -> bool {
        matches!(
            (self, next),
            (Self::Built, Self::Submitted)
                | (Self::Submitted, Self::ConfirmedSuccess)
                | (Self::Submitted, Self::ConfirmedReverted)
                | (Self::Submitted, Self::TimedOut)
        )
    }

    /// Polling stops on any terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ConfirmedSuccess | Self::ConfirmedReverted | Self::TimedOut
        )
    }

    /// Label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Submitted => "submitted",
            Self::ConfirmedSuccess => "success",
            Self::ConfirmedReverted => "reverted",
            Self::TimedOut => "timeout",
        }
    }
}

/// Connection lifecycle calls on the connection contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionAction {
    /// Accept a pending connection from a peer.
    Agree,
    /// Reject a pending connection from a peer.
    Reject,
    /// Withdraw our own pending request.
    Cancel,
    /// Close the active connection.
    Close,
}

impl ConnectionAction {
    /// Canonical function signature.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Agree => "agreeConnection(address)",
            Self::Reject => "rejectConnection(address)",
            Self::Cancel => "cancelConnection()",
            Self::Close => "closeConnection()",
        }
    }

    /// Whether the call takes the peer address argument.
    pub fn takes_peer(&self) -> bool {
        matches!(self, Self::Agree | Self::Reject)
    }
}

/// Token metadata needed for amount conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token contract.
    pub address: Address,
    /// Declared decimal count.
    pub decimals: u8,
}

impl TokenInfo {
    /// Create token metadata.
    pub fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals }
    }
}
