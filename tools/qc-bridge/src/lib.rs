//! QC-Bridge: command-line front end for the bridge withdrawal subsystem.
//!
//! ```text
//! qc-bridge login
//! qc-bridge withdraw --amount 1.5
//! qc-bridge balance
//! qc-bridge approve --token 0x.. --spender 0x.. --amount 10
//! qc-bridge encode-withdraw --file shares.json
//! ```
//!
//! The wallet is any Ethereum JSON-RPC endpoint holding the account keys.
//! The session token is kept in a JSON file between runs.

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Command};
