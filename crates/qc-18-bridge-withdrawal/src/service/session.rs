//! # Session Authenticator
//!
//! Challenge / sign / redeem login against the bridge API.
//!
//! ## Flow
//!
//! ```text
//! POST challenge {address}            -> {message}
//! wallet.request_signature(message)   -> raw signature (unwrapped if wrapped)
//! POST redeem {address, signature,
//!              deviceId, clientType,
//!              clientVersion}         -> {token}
//! ```
//!
//! The token is valid for a fixed window (24h by default) tracked client-side
//! and persisted under [`KEY_TOKEN`], [`KEY_EXPIRY`] and [`KEY_ADDRESS`].
//! Without a configured `device_id`, one is generated on first redeem and kept
//! under [`KEY_DEVICE_ID`]; logout leaves it in place.
//!
//! ## Coalescing
//!
//! At most one handshake runs at a time. Concurrent callers for the same
//! address await the same shared future and observe one outcome.

use crate::algorithms::{resolve_signature, run_with_retry, Attempt, RetryPolicy};
use crate::domain::{
    Address, AuthState, BridgeConfig, BridgeError, FailureKind, Session, TransportError,
};
use crate::ports::outbound::{HttpRequest, HttpResponse, HttpTransport, KeyValueStore, WalletSigner};
use bridge_telemetry::{metric_inc, AUTH_ROUND_TRIPS};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persisted bearer token.
pub const KEY_TOKEN: &str = "bridge.auth.token";
/// Persisted expiry, unix seconds.
pub const KEY_EXPIRY: &str = "bridge.auth.expiry";
/// Address the persisted token was issued to.
pub const KEY_ADDRESS: &str = "bridge.auth.address";
/// Generated device identifier.
pub const KEY_DEVICE_ID: &str = "bridge.auth.device_id";

type PendingAuth = Shared<BoxFuture<'static, Result<String, BridgeError>>>;

struct Inner {
    config: BridgeConfig,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn KeyValueStore>,
    session: RwLock<Session>,
    pending: Mutex<Option<(Address, PendingAuth)>>,
    /// Bumped on logout and address change; handshakes from an older epoch are discarded.
    epoch: AtomicU64,
}

/// Session authenticator. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionAuthenticator {
    inner: Arc<Inner>,
}

impl SessionAuthenticator {
    /// Create an authenticator.
    pub fn new(
        config: BridgeConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                session: RwLock::new(Session::default()),
                pending: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.session.read().clone()
    }

    /// Current handshake state.
    pub fn state(&self) -> AuthState {
        self.inner.session.read().state.clone()
    }

    /// Load a persisted token for `address` if one exists and has not expired.
    ///
    /// Returns whether a token was restored.
    pub fn restore(&self, address: &Address) -> Result<bool, BridgeError> {
        let store = &self.inner.store;
        let (Some(owner), Some(token), Some(expiry)) = (
            store.get(KEY_ADDRESS)?,
            store.get(KEY_TOKEN)?,
            store.get(KEY_EXPIRY)?,
        ) else {
            return Ok(false);
        };
        let Ok(owner) = Address::parse(&owner) else {
            warn!("[qc-18] Ignoring persisted session with malformed address");
            return Ok(false);
        };
        let Ok(expiry) = expiry.parse::<i64>() else {
            warn!("[qc-18] Ignoring persisted session with malformed expiry");
            return Ok(false);
        };
        if owner != *address || expiry <= Utc::now().timestamp() {
            return Ok(false);
        }

        *self.inner.session.write() = Session {
            address: Some(owner),
            bearer_token: Some(token),
            expiry: Some(expiry),
            state: AuthState::Authenticated,
        };
        debug!(address = %owner, "[qc-18] Restored persisted session");
        Ok(true)
    }

    /// Cached token for `address`, restoring from the store on first use.
    fn cached_token(&self, address: &Address) -> Result<Option<String>, BridgeError> {
        let now = Utc::now().timestamp();
        if let Some(token) = self.inner.session.read().valid_token(address, now) {
            return Ok(Some(token.to_string()));
        }
        let unseen = self.inner.session.read().address.is_none();
        if unseen && self.restore(address)? {
            return Ok(self
                .inner
                .session
                .read()
                .valid_token(address, now)
                .map(str::to_string));
        }
        Ok(None)
    }

    /// Authenticate the signer's current address.
    ///
    /// Returns the cached token when valid. Joins an in-flight handshake for
    /// the same address instead of starting a second one.
    pub async fn authenticate(&self, signer: Arc<dyn WalletSigner>) -> Result<String, BridgeError> {
        let address = signer.address().await?;
        if let Some(token) = self.cached_token(&address)? {
            return Ok(token);
        }

        let pending = {
            let mut slot = self.inner.pending.lock();
            match slot.as_ref() {
                Some((owner, pending)) if *owner == address => {
                    debug!(address = %address, "[qc-18] Joining in-flight authentication");
                    pending.clone()
                }
                superseded => {
                    if let Some((owner, _)) = superseded {
                        debug!(
                            previous = %owner,
                            address = %address,
                            "[qc-18] Superseding in-flight authentication"
                        );
                        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                    }
                    let epoch = self.inner.epoch.load(Ordering::SeqCst);
                    let fut = Self::handshake(self.inner.clone(), signer, address, epoch)
                        .boxed()
                        .shared();
                    *slot = Some((address, fut.clone()));
                    fut
                }
            }
        };

        let result = pending.clone().await;

        let mut slot = self.inner.pending.lock();
        if matches!(slot.as_ref(), Some((_, current)) if Shared::ptr_eq(current, &pending)) {
            *slot = None;
        }
        result
    }

    /// [`Self::authenticate`], retrying transient failures with linear backoff.
    ///
    /// Covers embedded signers that are still initialising.
    pub async fn authenticate_with_retry(
        &self,
        signer: Arc<dyn WalletSigner>,
    ) -> Result<String, BridgeError> {
        let auth = &self.inner.config.auth;
        let policy = RetryPolicy::new(
            auth.signer_ready_attempts.saturating_sub(1),
            auth.signer_ready_backoff,
        );
        run_with_retry(policy, |attempt| {
            let signer = signer.clone();
            async move {
                match self.authenticate(signer).await {
                    Ok(token) => Attempt::Done(token),
                    Err(e) if e.is_transient() => {
                        debug!(attempt, error = %e, "[qc-18] Authentication attempt failed");
                        Attempt::Retry(e)
                    }
                    Err(e) => Attempt::Fail(e),
                }
            }
        })
        .await
        .map_err(|e| e.into_inner())
    }

    /// Cached token unless `force_refresh` or expired; otherwise authenticate.
    pub async fn get_token(
        &self,
        signer: Arc<dyn WalletSigner>,
        force_refresh: bool,
    ) -> Result<String, BridgeError> {
        if force_refresh {
            let address = signer.address().await?;
            let mut session = self.inner.session.write();
            if session.address == Some(address) {
                session.clear_token();
            }
        }
        self.authenticate(signer).await
    }

    /// Drop the session and its persisted keys.
    pub fn logout(&self) -> Result<(), BridgeError> {
        self.invalidate()?;
        info!("[qc-18] Logged out");
        Ok(())
    }

    /// Wallet switched accounts. Everything tied to the old address goes.
    pub fn on_address_changed(&self, new_address: &Address) -> Result<(), BridgeError> {
        let current = self.inner.session.read().address;
        if current == Some(*new_address) {
            return Ok(());
        }
        debug!(address = %new_address, "[qc-18] Address changed, invalidating session");
        self.invalidate()
    }

    fn invalidate(&self) -> Result<(), BridgeError> {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        *self.inner.pending.lock() = None;
        *self.inner.session.write() = Session::default();
        for key in [KEY_TOKEN, KEY_EXPIRY, KEY_ADDRESS] {
            self.inner.store.remove(key)?;
        }
        Ok(())
    }

    async fn handshake(
        inner: Arc<Inner>,
        signer: Arc<dyn WalletSigner>,
        address: Address,
        epoch: u64,
    ) -> Result<String, BridgeError> {
        {
            // A handshake abandoned mid-way leaves an in-flight state behind.
            let mut session = inner.session.write();
            if session.state.is_in_flight() {
                session.state = AuthState::Unauthenticated;
            }
        }
        transition(&inner, AuthState::ChallengeRequested)?;
        metric_inc!(AUTH_ROUND_TRIPS);
        info!(address = %address, "[qc-18] Authenticating");

        match Self::round_trip(&inner, signer.as_ref(), &address, epoch).await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!(address = %address, error = %e, "[qc-18] Authentication failed");
                if is_current(&inner, epoch) {
                    if let Err(state_err) = transition(&inner, AuthState::Failed(e.to_string())) {
                        debug!(error = %state_err, "[qc-18] Failure not recorded in auth state");
                    }
                }
                Err(e)
            }
        }
    }

    async fn round_trip(
        inner: &Inner,
        signer: &dyn WalletSigner,
        address: &Address,
        epoch: u64,
    ) -> Result<String, BridgeError> {
        let api = &inner.config.api;

        let challenge = inner
            .transport
            .send(
                HttpRequest::post_json(
                    inner.config.api_url(&api.challenge_path),
                    json!({ "address": address }),
                )
                .with_timeout(api.request_timeout),
            )
            .await
            .map_err(|e| auth_transport_error("challenge", e))?;
        let message = expect_field(&challenge, "challenge", &["message", "challenge"])?;

        ensure_current(inner, epoch)?;
        transition(inner, AuthState::Signing)?;
        let raw = signer.request_signature(&message).await?;
        let resolved = resolve_signature(&raw)?;
        if resolved.has_warning() {
            warn!(address = %address, "[qc-18] Redeeming with a non-standard unwrapped signature");
        }

        ensure_current(inner, epoch)?;
        transition(inner, AuthState::Redeeming)?;
        let device_id = device_id(inner)?;
        let redeem = inner
            .transport
            .send(
                HttpRequest::post_json(
                    inner.config.api_url(&api.redeem_path),
                    json!({
                        "address": address,
                        "signature": resolved.signature,
                        "deviceId": device_id,
                        "clientType": api.client_type,
                        "clientVersion": api.client_version,
                    }),
                )
                .with_timeout(api.request_timeout),
            )
            .await
            .map_err(|e| auth_transport_error("redeem", e))?;
        let token = expect_field(&redeem, "redeem", &["token", "bearerToken"])?;

        ensure_current(inner, epoch)?;

        let validity = i64::try_from(inner.config.auth.token_validity.as_secs()).unwrap_or(i64::MAX);
        let expiry = Utc::now().timestamp().saturating_add(validity);
        inner.store.put(KEY_TOKEN, &token)?;
        inner.store.put(KEY_EXPIRY, &expiry.to_string())?;
        inner.store.put(KEY_ADDRESS, &address.to_hex())?;
        {
            let mut session = inner.session.write();
            session.address = Some(*address);
            session.bearer_token = Some(token.clone());
            session.expiry = Some(expiry);
        }
        transition(inner, AuthState::Authenticated)?;
        info!(address = %address, expiry, "[qc-18] Authenticated");
        Ok(token)
    }
}

/// Configured device id, else the persisted one, else a fresh persisted one.
fn device_id(inner: &Inner) -> Result<String, BridgeError> {
    let configured = &inner.config.api.device_id;
    if !configured.is_empty() {
        return Ok(configured.clone());
    }
    if let Some(stored) = inner.store.get(KEY_DEVICE_ID)? {
        return Ok(stored);
    }
    let generated = uuid::Uuid::new_v4().to_string();
    inner.store.put(KEY_DEVICE_ID, &generated)?;
    debug!(device_id = %generated, "[qc-18] Generated device id");
    Ok(generated)
}

fn is_current(inner: &Inner, epoch: u64) -> bool {
    inner.epoch.load(Ordering::SeqCst) == epoch
}

/// Fails once a logout, address change or newer handshake has taken over.
fn ensure_current(inner: &Inner, epoch: u64) -> Result<(), BridgeError> {
    if is_current(inner, epoch) {
        return Ok(());
    }
    Err(BridgeError::authentication(
        "session was invalidated during authentication",
        FailureKind::Terminal,
    ))
}

fn transition(inner: &Inner, next: AuthState) -> Result<(), BridgeError> {
    let mut session = inner.session.write();
    if !session.state.can_transition_to(&next) {
        return Err(BridgeError::InvalidStateTransition {
            machine: "auth",
            from: format!("{:?}", session.state),
            to: format!("{:?}", next),
        });
    }
    session.state = next;
    Ok(())
}

fn auth_transport_error(step: &str, error: TransportError) -> BridgeError {
    BridgeError::authentication(format!("{} request failed: {}", step, error), error.kind())
}

/// First present string field of a successful response.
fn expect_field(response: &HttpResponse, step: &str, names: &[&str]) -> Result<String, BridgeError> {
    if !response.is_success() {
        let detail = response
            .str_field("error")
            .or_else(|| response.str_field("message"))
            .unwrap_or("no detail");
        let kind = if response.status >= 500 || response.status == 429 {
            FailureKind::Transient
        } else {
            FailureKind::Terminal
        };
        return Err(BridgeError::authentication(
            format!("{} returned {}: {}", step, response.status, detail),
            kind,
        ));
    }
    names
        .iter()
        .find_map(|name| response.str_field(name))
        .map(str::to_string)
        .ok_or_else(|| {
            BridgeError::authentication(
                format!("{} response has no {}", step, names.join("/")),
                FailureKind::Terminal,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKeyValueStore;
    use crate::algorithms::wrap_signature;
    use crate::domain::{SignerError, TransportErrorKind};
    use crate::ports::outbound::{HttpBody, MockWalletSigner, ScriptedTransport};
    use std::time::Duration;

    fn user() -> Address {
        Address::from_bytes([0x11; 20])
    }

    fn auth_server() -> ScriptedTransport {
        ScriptedTransport::new(|request| {
            if request.url.ends_with("/api/auth/challenge") {
                Ok(HttpResponse::new(200, json!({"message": "sign me"})))
            } else if request.url.ends_with("/api/auth/redeem") {
                Ok(HttpResponse::new(200, json!({"token": "bearer-1"})))
            } else {
                Ok(HttpResponse::new(404, serde_json::Value::Null))
            }
        })
    }

    fn setup(
        transport: ScriptedTransport,
    ) -> (SessionAuthenticator, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let auth = SessionAuthenticator::new(BridgeConfig::default(), Arc::new(transport), store.clone());
        (auth, store)
    }

    #[tokio::test]
    async fn test_authenticate_persists_token() {
        let transport = auth_server();
        let (auth, store) = setup(transport.clone());
        let signer = Arc::new(MockWalletSigner::new(user()));

        let token = auth.authenticate(signer.clone()).await.unwrap();
        assert_eq!(token, "bearer-1");
        assert_eq!(auth.state(), AuthState::Authenticated);
        assert_eq!(store.get(KEY_TOKEN).unwrap().as_deref(), Some("bearer-1"));
        assert_eq!(store.get(KEY_ADDRESS).unwrap(), Some(user().to_hex()));

        let redeem = transport
            .requests()
            .into_iter()
            .find(|r| r.url.ends_with("/redeem"))
            .unwrap();
        let HttpBody::Json(body) = redeem.body else {
            panic!("redeem must be JSON");
        };
        assert_eq!(body["clientType"], "rust-cli");
        assert_eq!(body["signature"], MockWalletSigner::default_signature());

        // Second call is served from the session.
        auth.authenticate(signer.clone()).await.unwrap();
        assert_eq!(transport.count_path("/challenge"), 1);
        assert_eq!(signer.signature_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_coalesce() {
        let transport = auth_server().with_delay(Duration::from_millis(200));
        let (auth, _) = setup(transport.clone());
        let signer = Arc::new(MockWalletSigner::new(user()));

        let (a, b) = tokio::join!(
            auth.authenticate(signer.clone()),
            auth.authenticate(signer.clone())
        );
        assert_eq!(a.unwrap(), "bearer-1");
        assert_eq!(b.unwrap(), "bearer-1");
        assert_eq!(transport.count_path("/challenge"), 1);
        assert_eq!(transport.count_path("/redeem"), 1);
        assert_eq!(signer.signature_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_for_new_address_supersedes_old_one() {
        let transport = auth_server().with_delay(Duration::from_millis(200));
        let (auth, store) = setup(transport.clone());
        let first = Arc::new(MockWalletSigner::new(user()));
        let other = Address::from_bytes([0x22; 20]);
        let second = Arc::new(MockWalletSigner::new(other));

        let (a, b) = tokio::join!(auth.authenticate(first.clone()), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            auth.authenticate(second.clone()).await
        });

        let err = a.unwrap_err();
        assert!(matches!(err, BridgeError::Authentication { .. }));
        assert!(err.to_string().contains("invalidated"));
        assert_eq!(b.unwrap(), "bearer-1");
        assert_eq!(first.signature_count(), 0);
        assert_eq!(auth.state(), AuthState::Authenticated);
        assert_eq!(auth.session().address, Some(other));
        assert_eq!(store.get(KEY_ADDRESS).unwrap(), Some(other.to_hex()));
    }

    fn redeemed_device_ids(transport: &ScriptedTransport) -> Vec<String> {
        transport
            .requests()
            .into_iter()
            .filter(|r| r.url.ends_with("/redeem"))
            .filter_map(|r| match r.body {
                HttpBody::Json(body) => body["deviceId"].as_str().map(str::to_string),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_generated_device_id_survives_restart_and_logout() {
        let transport = auth_server();
        let store = Arc::new(InMemoryKeyValueStore::new());
        let signer = Arc::new(MockWalletSigner::new(user()));

        let first = SessionAuthenticator::new(
            BridgeConfig::default(),
            Arc::new(transport.clone()),
            store.clone(),
        );
        first.authenticate(signer.clone()).await.unwrap();
        first.logout().unwrap();

        let second = SessionAuthenticator::new(
            BridgeConfig::default(),
            Arc::new(transport.clone()),
            store.clone(),
        );
        second.authenticate(signer).await.unwrap();

        let ids = redeemed_device_ids(&transport);
        assert_eq!(ids.len(), 2);
        assert!(!ids[0].is_empty());
        assert_eq!(ids[0], ids[1]);
        assert_eq!(store.get(KEY_DEVICE_ID).unwrap(), Some(ids[0].clone()));
    }

    #[tokio::test]
    async fn test_configured_device_id_is_not_persisted() {
        let transport = auth_server();
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mut config = BridgeConfig::default();
        config.api.device_id = "laptop-1".to_string();
        let auth = SessionAuthenticator::new(config, Arc::new(transport.clone()), store.clone());

        auth.authenticate(Arc::new(MockWalletSigner::new(user()))).await.unwrap();

        assert_eq!(redeemed_device_ids(&transport), vec!["laptop-1".to_string()]);
        assert_eq!(store.get(KEY_DEVICE_ID).unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrapped_signature_is_unwrapped_before_redeem() {
        let transport = auth_server();
        let (auth, _) = setup(transport.clone());
        let signer = Arc::new(MockWalletSigner::new(user()));
        let mut inner = vec![0x22u8; 64];
        inner.push(28);
        let wrapped = wrap_signature(&Address::from_bytes([0xFA; 20]), &[1, 2, 3], &inner);
        signer.push_signature(Ok(format!("0x{}", hex::encode(wrapped))));

        auth.authenticate(signer).await.unwrap();
        let redeem = transport
            .requests()
            .into_iter()
            .find(|r| r.url.ends_with("/redeem"))
            .unwrap();
        let HttpBody::Json(body) = redeem.body else {
            panic!("redeem must be JSON");
        };
        assert_eq!(body["signature"], format!("0x{}", hex::encode(inner)));
    }

    #[tokio::test]
    async fn test_terminal_failure_sets_failed_state() {
        let transport =
            ScriptedTransport::new(|_| Ok(HttpResponse::new(403, json!({"error": "banned"}))));
        let (auth, _) = setup(transport);
        let signer = Arc::new(MockWalletSigner::new(user()));

        let err = auth.authenticate(signer.clone()).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("banned"));
        assert!(matches!(auth.state(), AuthState::Failed(_)));

        // A failed handshake does not stick: the next call starts over.
        auth.authenticate(signer).await.unwrap_err();
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_signer_is_retried() {
        let transport = auth_server();
        let (auth, _) = setup(transport.clone());
        let signer = Arc::new(MockWalletSigner::new(user()));
        signer.push_signature(Err(SignerError::not_ready("booting")));
        signer.push_signature(Err(SignerError::not_ready("booting")));

        let token = auth.authenticate_with_retry(signer.clone()).await.unwrap();
        assert_eq!(token, "bearer-1");
        assert_eq!(signer.signature_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling() {
        let (auth, _) = setup(auth_server());
        let signer = Arc::new(MockWalletSigner::new(user()));
        for _ in 0..3 {
            signer.push_signature(Err(SignerError::not_ready("booting")));
        }
        let err = auth.authenticate_with_retry(signer.clone()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Signer(_)));
        assert_eq!(signer.signature_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_timeout_is_transient() {
        let transport = ScriptedTransport::new(|_| {
            Err(TransportError::new(TransportErrorKind::Timeout, "slow"))
        });
        let (auth, _) = setup(transport);
        let err = auth
            .authenticate(Arc::new(MockWalletSigner::new(user())))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_force_refresh_reauthenticates() {
        let transport = auth_server();
        let (auth, _) = setup(transport.clone());
        let signer = Arc::new(MockWalletSigner::new(user()));

        auth.get_token(signer.clone(), false).await.unwrap();
        auth.get_token(signer.clone(), false).await.unwrap();
        assert_eq!(transport.count_path("/challenge"), 1);
        auth.get_token(signer.clone(), true).await.unwrap();
        assert_eq!(transport.count_path("/challenge"), 2);
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let transport = auth_server();
        let (auth, store) = setup(transport.clone());
        let expiry = Utc::now().timestamp() + 3600;
        store.put(KEY_TOKEN, "persisted").unwrap();
        store.put(KEY_EXPIRY, &expiry.to_string()).unwrap();
        store.put(KEY_ADDRESS, &user().to_hex()).unwrap();

        let token = auth
            .authenticate(Arc::new(MockWalletSigner::new(user())))
            .await
            .unwrap();
        assert_eq!(token, "persisted");
        assert_eq!(transport.requests().len(), 0);
    }

    #[tokio::test]
    async fn test_expired_persisted_token_is_ignored() {
        let (auth, store) = setup(auth_server());
        store.put(KEY_TOKEN, "stale").unwrap();
        store.put(KEY_EXPIRY, &(Utc::now().timestamp() - 1).to_string()).unwrap();
        store.put(KEY_ADDRESS, &user().to_hex()).unwrap();

        assert!(!auth.restore(&user()).unwrap());
        let token = auth
            .authenticate(Arc::new(MockWalletSigner::new(user())))
            .await
            .unwrap();
        assert_eq!(token, "bearer-1");
    }

    #[tokio::test]
    async fn test_address_change_invalidates() {
        let transport = auth_server();
        let (auth, store) = setup(transport.clone());
        let signer = Arc::new(MockWalletSigner::new(user()));
        auth.authenticate(signer.clone()).await.unwrap();

        let other = Address::from_bytes([0x22; 20]);
        auth.on_address_changed(&other).unwrap();
        assert_eq!(auth.session(), Session::default());
        assert_eq!(store.get(KEY_TOKEN).unwrap(), None);

        signer.set_address(other);
        auth.authenticate(signer).await.unwrap();
        assert_eq!(transport.count_path("/challenge"), 2);
        assert_eq!(auth.session().address, Some(other));
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let (auth, store) = setup(auth_server());
        auth.authenticate(Arc::new(MockWalletSigner::new(user())))
            .await
            .unwrap();
        auth.logout().unwrap();
        for key in [KEY_TOKEN, KEY_EXPIRY, KEY_ADDRESS] {
            assert_eq!(store.get(key).unwrap(), None);
        }
        assert_eq!(store.len(), 1);
        assert_eq!(auth.state(), AuthState::Unauthenticated);
    }
}
