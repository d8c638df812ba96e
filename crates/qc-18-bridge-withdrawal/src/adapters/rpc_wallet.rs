//! JSON-RPC Wallet Signer Adapter
//!
//! Implements `WalletSigner` against an Ethereum JSON-RPC endpoint that holds
//! the account's keys (a local node or a wallet bridge).

use super::http_transport::classify;
use crate::domain::{
    Address, CallRequest, SignerError, SignerErrorKind, TransactionRequest, TransportErrorKind,
    TxHash, TxReceipt,
};
use crate::ports::outbound::WalletSigner;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// EIP-1193 "user rejected request".
const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1193 "unauthorized": account not unlocked yet.
const CODE_UNAUTHORIZED: i64 = 4100;
/// Request already pending in the wallet.
const CODE_RESOURCE_UNAVAILABLE: i64 = -32002;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: String,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    status: Option<String>,
    block_number: Option<String>,
    #[serde(default)]
    revert_reason: Option<String>,
}

/// Wallet signer over JSON-RPC.
pub struct JsonRpcWalletSigner {
    client: Client,
    url: String,
    account: Option<Address>,
    request_id: AtomicU64,
}

impl JsonRpcWalletSigner {
    /// Connect to `url`. Without `account` the first of `eth_accounts` is used.
    pub fn new(
        url: impl Into<String>,
        account: Option<Address>,
        timeout: Duration,
    ) -> Result<Self, SignerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignerError::new(SignerErrorKind::Network, e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            account,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn rpc<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, SignerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id: self.next_id(),
        };
        debug!("[qc-18] rpc {}", method);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| transport_failure(&e))?;
        decode_response(status, &bytes)
    }

    async fn required<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, SignerError> {
        self.rpc(method, params).await?.ok_or_else(|| {
            SignerError::new(SignerErrorKind::Rpc, format!("{} returned no result", method))
        })
    }
}

fn transport_failure(error: &reqwest::Error) -> SignerError {
    let kind = match classify(error) {
        TransportErrorKind::Timeout => SignerErrorKind::Timeout,
        TransportErrorKind::Connect => SignerErrorKind::Network,
        _ => SignerErrorKind::Rpc,
    };
    SignerError::new(kind, error.to_string())
}

/// Decode a JSON-RPC reply.
///
/// A body that is not JSON, or a 5xx without a JSON-RPC error, came from a
/// gateway rather than the node and is treated as a network failure.
fn decode_response<R: DeserializeOwned>(
    status: u16,
    bytes: &[u8],
) -> Result<Option<R>, SignerError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        SignerError::new(
            SignerErrorKind::Network,
            format!("HTTP {} with non-JSON body: {}", status, e),
        )
    })?;
    let body: JsonRpcResponse<R> = match serde_json::from_value(value) {
        Ok(body) => body,
        Err(e) if status >= 500 => {
            return Err(SignerError::new(
                SignerErrorKind::Network,
                format!("HTTP {}: {}", status, e),
            ))
        }
        Err(e) => return Err(SignerError::new(SignerErrorKind::Rpc, e.to_string())),
    };

    if let Some(error) = body.error {
        return Err(map_rpc_error(error.code, &error.message));
    }
    if status >= 500 && body.result.is_none() {
        return Err(SignerError::new(
            SignerErrorKind::Network,
            format!("HTTP {} without a result", status),
        ));
    }
    Ok(body.result)
}

/// Tag a JSON-RPC error code.
pub fn map_rpc_error(code: i64, message: &str) -> SignerError {
    let kind = match code {
        CODE_USER_REJECTED => SignerErrorKind::UserRejected,
        CODE_UNAUTHORIZED | CODE_RESOURCE_UNAVAILABLE => SignerErrorKind::NotReady,
        _ => SignerErrorKind::Rpc,
    };
    SignerError::new(kind, format!("{} (code {})", message, code))
}

fn parse_quantity(field: &str, value: &str) -> Result<u64, SignerError> {
    let digits = value.trim_start_matches("0x");
    u64::from_str_radix(if digits.is_empty() { "0" } else { digits }, 16).map_err(|e| {
        SignerError::new(
            SignerErrorKind::Rpc,
            format!("bad {} '{}': {}", field, value, e),
        )
    })
}

fn parse_receipt(raw: RawReceipt) -> Result<TxReceipt, SignerError> {
    let status = match raw.status.as_deref() {
        Some(s) => parse_quantity("status", s)? == 1,
        None => {
            return Err(SignerError::new(
                SignerErrorKind::Rpc,
                "receipt has no status (pre-Byzantium node)",
            ))
        }
    };
    let block_number = raw
        .block_number
        .as_deref()
        .map(|b| parse_quantity("blockNumber", b))
        .transpose()?;
    Ok(TxReceipt {
        transaction_hash: raw.transaction_hash,
        status,
        block_number,
        revert_reason: raw.revert_reason,
    })
}

#[async_trait]
impl WalletSigner for JsonRpcWalletSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        if let Some(account) = self.account {
            return Ok(account);
        }
        let accounts: Vec<String> = self.required("eth_accounts", json!([])).await?;
        let first = accounts
            .first()
            .ok_or_else(|| SignerError::not_ready("wallet exposes no accounts yet"))?;
        Address::parse(first).map_err(|e| SignerError::new(SignerErrorKind::Rpc, e.to_string()))
    }

    async fn request_signature(&self, message: &str) -> Result<String, SignerError> {
        let account = self.address().await?;
        let payload = format!("0x{}", hex::encode(message.as_bytes()));
        self.required("personal_sign", json!([payload, account.to_hex()]))
            .await
    }

    async fn request_transaction(&self, tx: TransactionRequest) -> Result<TxHash, SignerError> {
        let mut object = json!({
            "from": tx.from.to_hex(),
            "to": tx.to.to_hex(),
            "data": tx.data,
            "value": format!("{:#x}", tx.value),
        });
        if let (Some(gas), Some(map)) = (tx.gas_limit, object.as_object_mut()) {
            map.insert("gas".into(), Value::String(format!("{:#x}", gas)));
        }
        self.required("eth_sendTransaction", json!([object])).await
    }

    async fn call(&self, request: CallRequest) -> Result<String, SignerError> {
        let mut object = json!({
            "to": request.to.to_hex(),
            "data": request.data,
        });
        if let (Some(from), Some(map)) = (request.from, object.as_object_mut()) {
            map.insert("from".into(), Value::String(from.to_hex()));
        }
        self.required("eth_call", json!([object, "latest"])).await
    }

    async fn get_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, SignerError> {
        let raw: Option<RawReceipt> = self.rpc("eth_getTransactionReceipt", json!([hash])).await?;
        raw.map(parse_receipt).transpose()
    }
}
