//! Subcommand execution.

use crate::cli::{Cli, Command};
use crate::settings::load_config;
use anyhow::{bail, Context, Result};
use primitive_types::U256;
use qc_18_bridge_withdrawal::{
    encode_withdraw, from_base_units, to_base_units, Address, BridgeConfig, JsonFileKeyValueStore,
    JsonRpcWalletSigner, QuorumResult, ReqwestTransport, SignatureShare, TokenInfo,
    WithdrawCall, WithdrawalApi, WithdrawalService,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Offline withdrawal input for `encode-withdraw`.
#[derive(Debug, Deserialize)]
pub struct WithdrawFile {
    /// Token released by the contract.
    pub token: Address,
    /// Recipient.
    pub user: Address,
    /// Amount in token units.
    pub amount: String,
    /// Token decimals.
    pub decimals: u8,
    /// Expiration the witnesses signed over.
    pub expiration: u64,
    /// Authorization code.
    pub code: String,
    /// 65-byte witness signatures, hex.
    pub signatures: Vec<String>,
}

/// Run the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Login => {
            let (service, _) = connect(&cli)?;
            service.login().await.context("Login failed")?;
            let session = service.authenticator().session();
            println!(
                "Authenticated as {} until {}",
                session.address.map(|a| a.to_hex()).unwrap_or_default(),
                session.expiry.unwrap_or_default()
            );
        }
        Command::Logout => {
            let (service, _) = connect(&cli)?;
            service.logout().await?;
            println!("Session cleared");
        }
        Command::Withdraw { amount } => {
            let (service, config) = connect(&cli)?;
            let receipt = service.withdraw(amount).await.context("Withdrawal failed")?;
            println!(
                "Withdrew {} with {} witness signatures in {}",
                from_base_units(receipt.amount, config.contracts.token_decimals),
                receipt.signature_count,
                receipt.confirmed.transaction.hash
            );
        }
        Command::Balance => {
            let (service, config) = connect(&cli)?;
            let balance = service.balance().await.context("Balance lookup failed")?;
            println!("{}", from_base_units(balance, config.contracts.token_decimals));
        }
        Command::Approve {
            token,
            spender,
            amount,
            decimals,
        } => {
            let (service, config) = connect(&cli)?;
            let token = TokenInfo::new(
                Address::parse_field("token", token)?,
                decimals.unwrap_or(config.contracts.token_decimals),
            );
            let spender = Address::parse_field("spender", spender)?;
            match service
                .approve_if_needed(token, &spender, amount)
                .await
                .context("Approval failed")?
            {
                Some(confirmed) => println!("Approved in {}", confirmed.transaction.hash),
                None => println!("Allowance already sufficient"),
            }
        }
        Command::EncodeWithdraw { file } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            println!("{}", encode_withdraw_file(&text)?);
        }
    }

    if cli.print_metrics {
        print!("{}", bridge_telemetry::encode_metrics()?);
    }
    Ok(())
}

fn connect(cli: &Cli) -> Result<(WithdrawalService, BridgeConfig)> {
    let config = load_config(cli.config.as_deref(), cli.api_url.as_deref())?;
    let service = build_service(cli, &config)?;
    Ok((service, config))
}

fn build_service(cli: &Cli, config: &BridgeConfig) -> Result<WithdrawalService> {
    let account = cli
        .account
        .as_deref()
        .map(|a| Address::parse_field("account", a))
        .transpose()?;
    let timeout = config.api.request_timeout;

    let signer = JsonRpcWalletSigner::new(cli.rpc_url.clone(), account, timeout)
        .context("Failed to create wallet client")?;
    let transport = ReqwestTransport::new(timeout).context("Failed to create HTTP client")?;
    let store = open_store(&cli.session_file)?;
    info!(rpc = %cli.rpc_url, api = %config.api.base_url, "Bridge client ready");

    Ok(WithdrawalService::new(
        config.clone(),
        Arc::new(signer),
        Arc::new(transport),
        Arc::new(store),
    )?)
}

fn open_store(path: &Path) -> Result<JsonFileKeyValueStore> {
    JsonFileKeyValueStore::open(path)
        .with_context(|| format!("Failed to open session file {}", path.display()))
}

/// Calldata for a withdrawal described by a [`WithdrawFile`] JSON document.
pub fn encode_withdraw_file(text: &str) -> Result<String> {
    let input: WithdrawFile = serde_json::from_str(text).context("Malformed withdrawal file")?;
    if input.signatures.is_empty() {
        bail!("withdrawal file has no signatures");
    }
    let amount: U256 = to_base_units(&input.amount, input.decimals)?;
    let shares = input
        .signatures
        .iter()
        .enumerate()
        .map(|(i, signature)| SignatureShare {
            witness: format!("file[{}]", i),
            signature_hex: signature.clone(),
            expected_expiration: input.expiration,
            code: input.code.clone(),
        })
        .collect::<Vec<_>>();
    let count = shares.len();
    let quorum = QuorumResult {
        shares,
        min_required: count,
        max_accepted: count,
        expiration: input.expiration,
        code: input.code.clone(),
    };
    let call = encode_withdraw(&WithdrawCall::from_quorum(
        input.token,
        input.user,
        amount,
        &quorum,
    )?)?;
    Ok(call.to_hex())
}
