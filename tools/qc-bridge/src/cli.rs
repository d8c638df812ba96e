//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// QC-Bridge: witness-authorized bridge withdrawals
#[derive(Parser, Debug)]
#[command(name = "qc-bridge")]
#[command(about = "Authenticate, collect witness signatures and withdraw from the bridge")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "QC_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bridge API base URL (overrides the config file)
    #[arg(long, env = "QC_BRIDGE_API_URL")]
    pub api_url: Option<String>,

    /// Wallet JSON-RPC endpoint
    #[arg(long, env = "QC_BRIDGE_RPC_URL", default_value = "http://127.0.0.1:8545")]
    pub rpc_url: String,

    /// Account to act as (defaults to the wallet's first account)
    #[arg(long, env = "QC_BRIDGE_ACCOUNT")]
    pub account: Option<String>,

    /// Where the session token is persisted
    #[arg(long, env = "QC_BRIDGE_SESSION_FILE", default_value = ".qc-bridge-session.json")]
    pub session_file: PathBuf,

    /// Print Prometheus metrics after the command
    #[arg(long)]
    pub print_metrics: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Authenticate the wallet against the bridge API
    Login,
    /// Drop the persisted session
    Logout,
    /// Collect witness signatures and withdraw
    Withdraw {
        /// Amount in token units, e.g. "1.5"
        #[arg(long)]
        amount: String,
    },
    /// Withdrawal-token balance of the wallet
    Balance,
    /// Approve a spender unless the allowance already covers the amount
    Approve {
        /// ERC-20 token contract
        #[arg(long)]
        token: String,
        /// Spender to approve
        #[arg(long)]
        spender: String,
        /// Amount in token units
        #[arg(long)]
        amount: String,
        /// Token decimals (defaults to the configured withdrawal token decimals)
        #[arg(long)]
        decimals: Option<u8>,
    },
    /// Encode withdrawal calldata offline from a JSON file of shares
    EncodeWithdraw {
        /// JSON file with token, user, amount, decimals, expiration, code, signatures
        #[arg(long)]
        file: PathBuf,
    },
}
