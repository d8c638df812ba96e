//! Fake bridge backend: auth server, witness directory and witnesses.

use async_trait::async_trait;
use parking_lot::Mutex;
use qc_18_bridge_withdrawal::domain::{TransportError, TransportErrorKind};
use qc_18_bridge_withdrawal::ports::{HttpBody, HttpRequest, HttpResponse, HttpTransport};
use qc_18_bridge_withdrawal::{
    Address, BridgeConfig, InMemoryKeyValueStore, MockWalletSigner, TxReceipt, WithdrawalService,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wallet address used by every flow.
pub const USER: Address = Address::from_bytes([0x11; 20]);
/// Withdrawal contract.
pub const WITHDRAWAL_CONTRACT: Address = Address::from_bytes([0xC0; 20]);
/// Withdrawal token.
pub const WITHDRAWAL_TOKEN: Address = Address::from_bytes([0x70; 20]);
/// Authorization code every witness signs over.
pub const CODE: &str = "bridge-code-1";

/// How one witness answers.
#[derive(Clone, Copy, Debug)]
pub enum Witness {
    /// Signs on the first attempt.
    Healthy,
    /// Busy for this many attempts, then signs.
    Busy(u32),
    /// 401 on every attempt.
    Unauthenticated,
    /// Connection refused on every attempt.
    Down,
}

/// In-process bridge backend.
pub struct FakeBridge {
    witnesses: Vec<Witness>,
    latency: Duration,
    attempts: Mutex<HashMap<usize, u32>>,
    challenges: AtomicUsize,
    redeems: AtomicUsize,
    directory_fetches: AtomicUsize,
}

impl FakeBridge {
    /// Backend with the given witness set.
    pub fn new(witnesses: Vec<Witness>) -> Self {
        Self {
            witnesses,
            latency: Duration::ZERO,
            attempts: Mutex::new(HashMap::new()),
            challenges: AtomicUsize::new(0),
            redeems: AtomicUsize::new(0),
            directory_fetches: AtomicUsize::new(0),
        }
    }

    /// `healthy` signing witnesses followed by `failing` unauthenticated ones.
    pub fn with_healthy(healthy: usize, failing: usize) -> Self {
        let mut witnesses = vec![Witness::Healthy; healthy];
        witnesses.extend(vec![Witness::Unauthenticated; failing]);
        Self::new(witnesses)
    }

    /// Delay every answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Challenge requests served.
    pub fn challenges(&self) -> usize {
        self.challenges.load(Ordering::SeqCst)
    }

    /// Redeem requests served.
    pub fn redeems(&self) -> usize {
        self.redeems.load(Ordering::SeqCst)
    }

    /// Directory requests served.
    pub fn directory_fetches(&self) -> usize {
        self.directory_fetches.load(Ordering::SeqCst)
    }

    /// Signing attempts seen by witness `index`.
    pub fn attempts(&self, index: usize) -> u32 {
        self.attempts.lock().get(&index).copied().unwrap_or(0)
    }

    fn witness_url(index: usize) -> String {
        format!("http://witness-{}.bridge.test", index)
    }

    fn signature(index: usize) -> String {
        let mut bytes = vec![(index as u8).wrapping_add(1); 64];
        bytes.push(27 + (index % 2) as u8);
        format!("0x{}", hex::encode(bytes))
    }

    fn answer(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        if url.ends_with("/api/auth/challenge") {
            let n = self.challenges.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(HttpResponse::new(200, json!({ "message": format!("challenge-{}", n) })));
        }
        if url.ends_with("/api/auth/redeem") {
            let n = self.redeems.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(HttpResponse::new(200, json!({ "token": format!("token-{}", n) })));
        }
        if url.ends_with("/api/witness/servers") {
            self.directory_fetches.fetch_add(1, Ordering::SeqCst);
            if request.bearer.is_none() {
                return Ok(HttpResponse::new(401, Value::Null));
            }
            let servers: Vec<Value> = (0..self.witnesses.len())
                .map(|i| json!({ "url": Self::witness_url(i) }))
                .collect();
            return Ok(HttpResponse::new(200, json!({ "servers": servers })));
        }

        let Some(index) =
            (0..self.witnesses.len()).find(|i| url.starts_with(&format!("{}/", Self::witness_url(*i))))
        else {
            return Ok(HttpResponse::new(404, Value::Null));
        };
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(index).or_insert(0);
            *count += 1;
            *count
        };
        let HttpBody::Json(body) = &request.body else {
            return Ok(HttpResponse::new(400, Value::Null));
        };
        let signed = HttpResponse::new(
            200,
            json!({
                "status": "ok",
                "signature": Self::signature(index),
                "expectedExpiration": body["expiration"],
                "code": CODE,
            }),
        );

        match self.witnesses[index] {
            Witness::Healthy => Ok(signed),
            Witness::Busy(times) if attempt <= times => {
                Ok(HttpResponse::new(200, json!({ "status": "busy" })))
            }
            Witness::Busy(_) => Ok(signed),
            Witness::Unauthenticated => Ok(HttpResponse::new(401, Value::Null)),
            Witness::Down => Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            )),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBridge {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.answer(&request)
    }
}

/// Configuration pointing at the fake contracts.
pub fn bridge_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.contracts.withdrawal_contract = WITHDRAWAL_CONTRACT;
    config.contracts.withdrawal_token = WITHDRAWAL_TOKEN;
    config.contracts.token_decimals = 6;
    config
}

/// Successful receipt for `hash`.
pub fn mined(hash: &str) -> TxReceipt {
    TxReceipt {
        transaction_hash: hash.to_string(),
        status: true,
        block_number: Some(100),
        revert_reason: None,
    }
}

/// Service, wallet and backend wired together.
pub struct Harness {
    /// Service under test.
    pub service: WithdrawalService,
    /// Scripted wallet.
    pub wallet: Arc<MockWalletSigner>,
    /// Fake backend.
    pub bridge: Arc<FakeBridge>,
    /// Session store.
    pub store: Arc<InMemoryKeyValueStore>,
}

impl Harness {
    /// Wire `bridge` to a fresh wallet and store.
    pub fn new(bridge: FakeBridge) -> Self {
        Self::with_store(bridge, Arc::new(InMemoryKeyValueStore::new()))
    }

    /// Wire `bridge` to a fresh wallet and an existing store.
    pub fn with_store(bridge: FakeBridge, store: Arc<InMemoryKeyValueStore>) -> Self {
        Self::with_wallet(bridge, MockWalletSigner::new(USER), store)
    }

    /// Wire `bridge` to a prepared wallet and store.
    pub fn with_wallet(
        bridge: FakeBridge,
        wallet: MockWalletSigner,
        store: Arc<InMemoryKeyValueStore>,
    ) -> Self {
        let wallet = Arc::new(wallet);
        let bridge = Arc::new(bridge);
        let service = WithdrawalService::new(
            bridge_config(),
            wallet.clone(),
            bridge.clone(),
            store.clone(),
        )
        .expect("valid test configuration");
        Self {
            service,
            wallet,
            bridge,
            store,
        }
    }
}
