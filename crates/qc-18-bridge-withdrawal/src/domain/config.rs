//! Bridge withdrawal configuration with validation.
//!
//! Loaded from TOML; every section falls back to its defaults.

use super::value_objects::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Quorum bounds are incoherent.
    #[error("Invalid quorum: {0}")]
    InvalidQuorum(String),
    /// A duration or count is zero.
    #[error("Invalid timing: {0}")]
    InvalidTiming(String),
    /// Token metadata is unusable.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// File could not be read or parsed.
    #[error("Failed to load config: {0}")]
    Load(String),
}

impl From<ConfigError> for super::errors::BridgeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Main bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Auth and witness directory endpoints
    pub api: ApiConfig,
    /// On-chain addresses
    pub contracts: ContractsConfig,
    /// Witness quorum parameters
    pub quorum: QuorumConfig,
    /// Session parameters
    pub auth: AuthConfig,
    /// Confirmation polling
    pub executor: ExecutorConfig,
    /// Read caches
    pub cache: CacheConfig,
}

impl BridgeConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quorum.min_required == 0 {
            return Err(ConfigError::InvalidQuorum(
                "min_required cannot be 0".into(),
            ));
        }
        if self.quorum.max_accepted < self.quorum.min_required {
            return Err(ConfigError::InvalidQuorum(format!(
                "max_accepted ({}) < min_required ({})",
                self.quorum.max_accepted, self.quorum.min_required
            )));
        }
        if self.quorum.signature_validity.is_zero() {
            return Err(ConfigError::InvalidTiming(
                "signature_validity cannot be 0".into(),
            ));
        }
        if self.executor.poll_interval.is_zero() || self.executor.max_polls == 0 {
            return Err(ConfigError::InvalidTiming(
                "poll_interval and max_polls must be positive".into(),
            ));
        }
        if self.auth.token_validity.is_zero() {
            return Err(ConfigError::InvalidTiming(
                "token_validity cannot be 0".into(),
            ));
        }
        // U256 holds at most 78 decimal digits.
        if self.contracts.token_decimals > 77 {
            return Err(ConfigError::InvalidToken(format!(
                "{} decimals exceeds uint256 precision",
                self.contracts.token_decimals
            )));
        }
        Ok(())
    }

    /// Full URL for an API path.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api.base_url.trim_end_matches('/'), path)
    }
}

/// Auth server and directory endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the bridge API
    pub base_url: String,
    /// Challenge endpoint
    pub challenge_path: String,
    /// Redeem endpoint
    pub redeem_path: String,
    /// Witness directory endpoint
    pub directory_path: String,
    /// Device identifier sent on redeem. Empty: generated once and kept in
    /// the session store.
    pub device_id: String,
    /// Client type sent on redeem
    pub client_type: String,
    /// Client version sent on redeem
    pub client_version: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            challenge_path: "/api/auth/challenge".to_string(),
            redeem_path: "/api/auth/redeem".to_string(),
            directory_path: "/api/witness/servers".to_string(),
            device_id: String::new(),
            client_type: "rust-cli".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// On-chain addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Withdrawal contract
    pub withdrawal_contract: Address,
    /// Token released by the withdrawal contract
    pub withdrawal_token: Address,
    /// Declared decimals of the withdrawal token
    pub token_decimals: u8,
    /// Cross-chain bridge contract
    pub cross_chain_bridge: Address,
    /// Connection lifecycle contract
    pub connection_contract: Address,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            withdrawal_contract: Address::ZERO,
            withdrawal_token: Address::ZERO,
            token_decimals: 18,
            cross_chain_bridge: Address::ZERO,
            connection_contract: Address::ZERO,
        }
    }
}

/// Witness quorum parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Minimum signatures the contract accepts
    pub min_required: usize,
    /// Stop collecting after this many
    pub max_accepted: usize,
    /// Lifetime of a witness authorization (default: 15 minutes)
    #[serde(with = "humantime_serde")]
    pub signature_validity: Duration,
    /// Additional attempts per witness
    pub max_retries: u32,
    /// Backoff per attempt number (attempt x step)
    #[serde(with = "humantime_serde")]
    pub retry_backoff_step: Duration,
    /// Witness signing endpoint, appended to each witness URL
    pub witness_sign_path: String,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            min_required: 18,
            max_accepted: 20,
            signature_validity: Duration::from_secs(15 * 60),
            max_retries: 2,
            retry_backoff_step: Duration::from_secs(2),
            witness_sign_path: "/api/withdraw/sign".to_string(),
        }
    }
}

/// Session parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token lifetime (default: 24 hours)
    #[serde(with = "humantime_serde")]
    pub token_validity: Duration,
    /// Attempts while the signer is not ready
    pub signer_ready_attempts: u32,
    /// Backoff step between those attempts
    #[serde(with = "humantime_serde")]
    pub signer_ready_backoff: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_validity: Duration::from_secs(24 * 3600),
            signer_ready_attempts: 3,
            signer_ready_backoff: Duration::from_secs(1),
        }
    }
}

/// Confirmation polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Delay between receipt polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Receipt polls before giving up
    pub max_polls: u32,
    /// Gas limit for withdrawal calls (None = wallet estimates)
    pub gas_limit: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
            gas_limit: Some(500_000),
        }
    }
}

/// Read caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Balance cache lifetime
    #[serde(with = "humantime_serde")]
    pub balance_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            balance_ttl: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quorum.min_required, 18);
        assert_eq!(config.quorum.max_accepted, 20);
        assert_eq!(config.executor.max_polls, 60);
        assert_eq!(config.cache.balance_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_max_below_min() {
        let mut config = BridgeConfig::default();
        config.quorum.max_accepted = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuorum(_))
        ));
    }

    #[test]
    fn test_rejects_zero_polls() {
        let mut config = BridgeConfig::default();
        config.executor.max_polls = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_rejects_excess_decimals() {
        let mut config = BridgeConfig::default();
        config.contracts.token_decimals = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let text = r#"
            [api]
            base_url = "https://bridge.example/"

            [quorum]
            min_required = 3
            max_accepted = 5
            retry_backoff_step = "500ms"

            [contracts]
            withdrawal_contract = "0x00000000000000000000000000000000000000aa"
            token_decimals = 6
        "#;
        let config = BridgeConfig::from_toml_str(text).unwrap();
        assert_eq!(config.quorum.min_required, 3);
        assert_eq!(config.quorum.retry_backoff_step, Duration::from_millis(500));
        assert_eq!(config.contracts.token_decimals, 6);
        assert_eq!(
            config.api_url("/api/auth/challenge"),
            "https://bridge.example/api/auth/challenge"
        );
        assert_eq!(config.executor.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_from_toml_rejects_bad_address() {
        let text = r#"
            [contracts]
            withdrawal_contract = "0x1234"
        "#;
        assert!(matches!(
            BridgeConfig::from_toml_str(text),
            Err(ConfigError::Load(_))
        ));
    }
}
