//! # Outbound Ports
//!
//! Capabilities the bridge consumes: a wallet, an HTTP transport and a
//! persistent key-value store.

use crate::domain::{
    Address, CallRequest, SignerError, StorageError, TransactionRequest, TransportError, TxHash,
    TxReceipt,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wallet capability - outbound port.
///
/// Implementations must tolerate being called before their secure context is
/// ready and report that as [`crate::domain::SignerErrorKind::NotReady`].
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Currently selected account.
    async fn address(&self) -> Result<Address, SignerError>;

    /// Sign an arbitrary message; returns hex.
    async fn request_signature(&self, message: &str) -> Result<String, SignerError>;

    /// Submit a transaction; returns its hash.
    async fn request_transaction(&self, tx: TransactionRequest) -> Result<TxHash, SignerError>;

    /// Read-only contract call; returns hex.
    async fn call(&self, request: CallRequest) -> Result<String, SignerError>;

    /// Receipt for `hash`, `None` while pending.
    async fn get_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, SignerError>;
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

/// Request body.
#[derive(Clone, Debug, PartialEq)]
pub enum HttpBody {
    /// No body.
    Empty,
    /// `application/json`.
    Json(Value),
}

/// Plain HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
    /// Body.
    pub body: HttpBody,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// GET `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            bearer: None,
            body: HttpBody::Empty,
            timeout: None,
        }
    }

    /// POST a JSON body.
    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            bearer: None,
            body: HttpBody::Json(body),
            timeout: None,
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Plain HTTP response. Non-JSON bodies arrive as [`Value::Null`].
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Decoded JSON body.
    pub body: Value,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// String field of the body.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}

/// HTTP transport - outbound port. JSON and form bodies only, no custom framing.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request. Non-2xx statuses are responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Persistent key-value store - outbound port.
///
/// Holds only the bearer token, its expiry and the address it belongs to.
pub trait KeyValueStore: Send + Sync {
    /// Read a key.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a key.
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scripted wallet for tests.
///
/// Each capability pops from its own queue and falls back to a default once
/// the queue is empty: a fixed 65-byte signature, sequential transaction
/// hashes, a zero word for calls and "pending" for receipts.
pub struct MockWalletSigner {
    address: Mutex<Address>,
    signatures: Mutex<VecDeque<Result<String, SignerError>>>,
    transactions: Mutex<VecDeque<Result<TxHash, SignerError>>>,
    receipts: Mutex<VecDeque<Result<Option<TxReceipt>, SignerError>>>,
    call_results: Mutex<HashMap<[u8; 4], String>>,
    sign_delay: Duration,
    call_delay: Duration,
    /// Signature prompts shown.
    pub signature_requests: AtomicUsize,
    /// Receipt lookups performed.
    pub receipt_polls: AtomicUsize,
    /// Read-only calls performed.
    pub call_count: AtomicUsize,
    /// Transactions handed to the wallet, in order.
    pub submitted: Mutex<Vec<TransactionRequest>>,
}

impl MockWalletSigner {
    /// Default signature returned once the script is exhausted.
    pub fn default_signature() -> String {
        let mut bytes = vec![0x11u8; 64];
        bytes.push(27);
        format!("0x{}", hex::encode(bytes))
    }

    /// Create a wallet for `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address: Mutex::new(address),
            signatures: Mutex::new(VecDeque::new()),
            transactions: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(VecDeque::new()),
            call_results: Mutex::new(HashMap::new()),
            sign_delay: Duration::ZERO,
            call_delay: Duration::ZERO,
            signature_requests: AtomicUsize::new(0),
            receipt_polls: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every signature request.
    pub fn with_sign_delay(mut self, delay: Duration) -> Self {
        self.sign_delay = delay;
        self
    }

    /// Sleep this long inside every read-only call, after the answer is chosen.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Switch accounts.
    pub fn set_address(&self, address: Address) {
        *self.address.lock() = address;
    }

    /// Queue a signature outcome.
    pub fn push_signature(&self, result: Result<String, SignerError>) {
        self.signatures.lock().push_back(result);
    }

    /// Queue a transaction outcome.
    pub fn push_transaction(&self, result: Result<TxHash, SignerError>) {
        self.transactions.lock().push_back(result);
    }

    /// Queue a receipt lookup outcome.
    pub fn push_receipt(&self, result: Result<Option<TxReceipt>, SignerError>) {
        self.receipts.lock().push_back(result);
    }

    /// Answer calls whose calldata starts with `selector`.
    pub fn set_call_result(&self, selector: [u8; 4], result: impl Into<String>) {
        self.call_results.lock().insert(selector, result.into());
    }

    /// Number of signature prompts shown.
    pub fn signature_count(&self) -> usize {
        self.signature_requests.load(Ordering::SeqCst)
    }

    /// Number of receipt lookups.
    pub fn poll_count(&self) -> usize {
        self.receipt_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        Ok(*self.address.lock())
    }

    async fn request_signature(&self, _message: &str) -> Result<String, SignerError> {
        self.signature_requests.fetch_add(1, Ordering::SeqCst);
        if !self.sign_delay.is_zero() {
            tokio::time::sleep(self.sign_delay).await;
        }
        let scripted = self.signatures.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(Self::default_signature()))
    }

    async fn request_transaction(&self, tx: TransactionRequest) -> Result<TxHash, SignerError> {
        let index = {
            let mut submitted = self.submitted.lock();
            submitted.push(tx);
            submitted.len()
        };
        let scripted = self.transactions.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("0x{:064x}", index)))
    }

    async fn call(&self, request: CallRequest) -> Result<String, SignerError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let data = crate::algorithms::abi::decode_hex("data", &request.data)
            .map_err(|e| SignerError::new(crate::domain::SignerErrorKind::Rpc, e.to_string()))?;
        let mut key = [0u8; 4];
        if data.len() >= 4 {
            key.copy_from_slice(&data[..4]);
        }
        let answer = self
            .call_results
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("0x{}", "0".repeat(64)));
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        Ok(answer)
    }

    async fn get_receipt(&self, _hash: &TxHash) -> Result<Option<TxReceipt>, SignerError> {
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.receipts.lock().pop_front();
        scripted.unwrap_or(Ok(None))
    }
}

type TransportHandler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport whose responses come from a closure; records every request.
#[derive(Clone)]
pub struct ScriptedTransport {
    handler: Arc<TransportHandler>,
    delay: Duration,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    /// Answer every request with `handler`.
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL ends with `suffix`.
    pub fn count_path(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(&request)
    }
}
