//! # Service Layer
//!
//! Stateful components built on the pure algorithms and the outbound ports.
//!
//! - [`SessionAuthenticator`]: challenge/sign/redeem login with coalescing
//! - [`QuorumCollector`]: witness fan-out and threshold collection
//! - [`TransactionExecutor`]: submit and poll for a terminal receipt
//! - [`BalanceReader`]: cached `balanceOf`
//! - [`WithdrawalService`]: the [`crate::ports::WithdrawalApi`] implementation

mod balance;
mod executor;
mod quorum;
mod session;
mod withdrawal;

pub use balance::BalanceReader;
pub use executor::TransactionExecutor;
pub use quorum::{QuorumCollector, WitnessFailure};
pub use session::{SessionAuthenticator, KEY_ADDRESS, KEY_DEVICE_ID, KEY_EXPIRY, KEY_TOKEN};
pub use withdrawal::WithdrawalService;
