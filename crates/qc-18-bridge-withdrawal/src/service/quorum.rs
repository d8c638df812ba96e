//! # Quorum Collector
//!
//! Fans one withdrawal authorization out to every witness in the directory
//! and gathers signatures until the cap is reached or every witness is done.
//!
//! ## Per-witness policy
//!
//! | Response | Outcome |
//! |----------|---------|
//! | `200 {"status":"ok", signature, expectedExpiration, code}` | share |
//! | `200 {"status":"busy"}`, `429` | retry |
//! | `5xx`, timeout, connect error | retry |
//! | `401`, `403` | terminal |
//! | anything else | terminal |
//!
//! Retries back off `attempt x retry_backoff_step` and stop after
//! `max_retries` extra attempts. Collection ends once `max_accepted` shares
//! agree on the same expiration and code, or when the signing window closes;
//! leftover requests are abandoned. The largest agreeing group is kept and
//! shares outside it count as failures.

use super::session::SessionAuthenticator;
use crate::algorithms::{run_with_retry, Attempt, RetryPolicy};
use crate::domain::{
    invariant_quorum_capped, Address, BridgeConfig, BridgeError, QuorumResult, SignatureShare,
    TransportError, TransportErrorKind, WitnessRequest, WitnessServer,
};
use crate::ports::outbound::{HttpRequest, HttpResponse, HttpTransport, WalletSigner};
use bridge_telemetry::{log_witness_event, metric_inc, QUORUM_COLLECTIONS, WITNESS_REQUESTS};
use chrono::Utc;
use primitive_types::U256;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Why one witness produced no share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WitnessFailure {
    /// Witness asked us to come back later.
    Busy,
    /// Bearer token refused.
    Unauthenticated,
    /// Witness answered 5xx.
    ServerError(u16),
    /// Timeout or connection failure.
    Network(String),
    /// Any other refusal or a malformed answer.
    Rejected(String),
}

impl WitnessFailure {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Unauthenticated => "unauthenticated",
            Self::ServerError(_) => "server_error",
            Self::Network(_) => "network",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Worth another attempt against the same witness.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::ServerError(_) | Self::Network(_))
    }
}

#[derive(Debug, Deserialize)]
struct Directory {
    #[serde(default)]
    servers: Vec<WitnessServer>,
}

/// Witness quorum collector.
pub struct QuorumCollector {
    config: BridgeConfig,
    transport: Arc<dyn HttpTransport>,
    auth: SessionAuthenticator,
}

impl QuorumCollector {
    /// Create a collector sharing `auth` with the rest of the service.
    pub fn new(
        config: BridgeConfig,
        transport: Arc<dyn HttpTransport>,
        auth: SessionAuthenticator,
    ) -> Self {
        Self {
            config,
            transport,
            auth,
        }
    }

    /// Collect witness signatures authorizing `user` to withdraw `amount` base units.
    pub async fn collect(
        &self,
        signer: Arc<dyn WalletSigner>,
        user: &Address,
        amount: U256,
    ) -> Result<QuorumResult, BridgeError> {
        let quorum = &self.config.quorum;
        let (servers, token) = self.fetch_directory(signer).await?;
        if servers.is_empty() {
            metric_inc!(QUORUM_COLLECTIONS, &["insufficient"]);
            return Err(BridgeError::InsufficientQuorum {
                got: 0,
                required: quorum.min_required,
            });
        }

        let started = Instant::now();
        let deadline = started + quorum.signature_validity;
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let request = WitnessRequest {
            user_address: *user,
            contract_address: self.config.contracts.withdrawal_contract,
            amount: amount.to_string(),
            expiration: now.saturating_add(quorum.signature_validity.as_secs()),
        };
        let payload = serde_json::to_value(&request)
            .map_err(|e| BridgeError::Config(format!("witness payload: {}", e)))?;
        let policy = RetryPolicy::new(quorum.max_retries, quorum.retry_backoff_step);

        info!(
            witnesses = servers.len(),
            min_required = quorum.min_required,
            max_accepted = quorum.max_accepted,
            expiration = request.expiration,
            "[qc-18] Requesting witness signatures"
        );

        // Every request is in flight before the first result is awaited.
        let mut tasks = JoinSet::new();
        for server in servers {
            let url = format!(
                "{}{}",
                server.url.trim_end_matches('/'),
                quorum.witness_sign_path
            );
            tasks.spawn(request_witness(
                self.transport.clone(),
                server.url,
                url,
                token.clone(),
                payload.clone(),
                policy,
                self.config.api.request_timeout,
            ));
        }

        let mut groups = ShareGroups::default();
        let mut failed = 0usize;
        while groups.largest() < quorum.max_accepted {
            let joined = match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        collected = groups.largest(),
                        pending = tasks.len(),
                        "[qc-18] Signing window closed before all witnesses answered"
                    );
                    break;
                }
            };
            match joined {
                Ok((_, Ok(share))) => groups.add(share),
                Ok((witness, Err(failure))) => {
                    log_witness_event!(
                        warn,
                        "[qc-18] Witness gave no signature",
                        witness,
                        outcome = failure.label(),
                        detail = ?failure
                    );
                    failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "[qc-18] Witness task aborted");
                    failed += 1;
                }
            }
        }
        let abandoned = tasks.len();
        tasks.detach_all();

        let (mut shares, dissenting) = groups.into_majority();
        for share in &dissenting {
            log_witness_event!(
                warn,
                "[qc-18] Dropping share outside the majority expiration and code",
                share.witness,
                expiration = share.expected_expiration
            );
        }
        failed += dissenting.len();
        shares.truncate(quorum.max_accepted);

        let (expiration, code) = shares
            .first()
            .map(|s| (s.expected_expiration, s.code.clone()))
            .unwrap_or((request.expiration, String::new()));
        let result = QuorumResult {
            shares,
            min_required: quorum.min_required,
            max_accepted: quorum.max_accepted,
            expiration,
            code,
        };
        debug_assert!(invariant_quorum_capped(&result));

        if !result.is_usable() {
            metric_inc!(QUORUM_COLLECTIONS, &["insufficient"]);
            warn!(
                got = result.shares.len(),
                required = result.min_required,
                failed,
                "[qc-18] Witness quorum not met"
            );
            return Err(BridgeError::InsufficientQuorum {
                got: result.shares.len(),
                required: result.min_required,
            });
        }

        metric_inc!(QUORUM_COLLECTIONS, &["met"]);
        info!(
            signatures = result.shares.len(),
            failed,
            abandoned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "[qc-18] Witness quorum met"
        );
        Ok(result)
    }

    /// Directory of witnesses plus the token it was fetched with.
    ///
    /// An auth refusal triggers one refresh and one retry.
    async fn fetch_directory(
        &self,
        signer: Arc<dyn WalletSigner>,
    ) -> Result<(Vec<WitnessServer>, String), BridgeError> {
        let url = self.config.api_url(&self.config.api.directory_path);
        let mut token = self.auth.get_token(signer.clone(), false).await?;
        let mut refreshed = false;

        loop {
            let response = self
                .transport
                .send(
                    HttpRequest::get(url.clone())
                        .with_bearer(token.clone())
                        .with_timeout(self.config.api.request_timeout),
                )
                .await?;

            match response.status {
                401 | 403 if !refreshed => {
                    debug!("[qc-18] Directory refused token, refreshing");
                    refreshed = true;
                    token = self.auth.get_token(signer.clone(), true).await?;
                }
                _ if response.is_success() => {
                    let directory: Directory = serde_json::from_value(response.body)
                        .map_err(|e| {
                            TransportError::new(
                                TransportErrorKind::Decode,
                                format!("witness directory: {}", e),
                            )
                        })?;
                    return Ok((dedup(directory.servers), token));
                }
                status if status >= 500 => {
                    return Err(TransportError::new(
                        TransportErrorKind::ServerError,
                        format!("witness directory returned {}", status),
                    )
                    .into());
                }
                status => {
                    return Err(TransportError::new(
                        TransportErrorKind::Rejected,
                        format!("witness directory returned {}", status),
                    )
                    .into());
                }
            }
        }
    }
}

/// Shares bucketed by the `(expectedExpiration, code)` pair they sign over.
#[derive(Default)]
struct ShareGroups {
    groups: Vec<Vec<SignatureShare>>,
}

impl ShareGroups {
    fn add(&mut self, share: SignatureShare) {
        let existing = self.groups.iter_mut().find(|group| {
            group[0].expected_expiration == share.expected_expiration && group[0].code == share.code
        });
        match existing {
            Some(group) => group.push(share),
            None => self.groups.push(vec![share]),
        }
    }

    fn largest(&self) -> usize {
        self.groups.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Largest group (earliest on ties) and every share outside it.
    fn into_majority(self) -> (Vec<SignatureShare>, Vec<SignatureShare>) {
        let mut groups = self.groups;
        let mut best = 0;
        for (i, group) in groups.iter().enumerate() {
            if group.len() > groups[best].len() {
                best = i;
            }
        }
        if groups.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let majority = groups.remove(best);
        (majority, groups.into_iter().flatten().collect())
    }
}

/// Drop repeated URLs, keeping the first occurrence.
fn dedup(servers: Vec<WitnessServer>) -> Vec<WitnessServer> {
    let mut seen = HashSet::new();
    servers
        .into_iter()
        .filter(|s| seen.insert(s.url.trim_end_matches('/').to_string()))
        .collect()
}

async fn request_witness(
    transport: Arc<dyn HttpTransport>,
    witness: String,
    url: String,
    token: String,
    payload: Value,
    policy: RetryPolicy,
    timeout: Duration,
) -> (String, Result<SignatureShare, WitnessFailure>) {
    let outcome = run_with_retry(policy, |attempt| {
        let transport = transport.clone();
        let request = HttpRequest::post_json(url.clone(), payload.clone())
            .with_bearer(token.clone())
            .with_timeout(timeout);
        let witness = witness.clone();
        async move {
            let result = classify(&witness, transport.send(request).await);
            let label = match &result {
                Ok(_) => "ok",
                Err(failure) => failure.label(),
            };
            metric_inc!(WITNESS_REQUESTS, &[label]);
            match result {
                Ok(share) => Attempt::Done(share),
                Err(failure) if failure.is_retryable() => {
                    log_witness_event!(debug, "[qc-18] Witness attempt will be retried", witness, attempt, outcome = label);
                    Attempt::Retry(failure)
                }
                Err(failure) => Attempt::Fail(failure),
            }
        }
    })
    .await
    .map_err(|e| e.into_inner());
    (witness, outcome)
}

fn classify(
    witness: &str,
    result: Result<HttpResponse, TransportError>,
) -> Result<SignatureShare, WitnessFailure> {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            return Err(match e.kind {
                TransportErrorKind::Timeout | TransportErrorKind::Connect => {
                    WitnessFailure::Network(e.message)
                }
                TransportErrorKind::ServerError => WitnessFailure::ServerError(500),
                _ => WitnessFailure::Rejected(e.to_string()),
            })
        }
    };

    match response.status {
        429 => Err(WitnessFailure::Busy),
        401 | 403 => Err(WitnessFailure::Unauthenticated),
        status if status >= 500 => Err(WitnessFailure::ServerError(status)),
        _ if response.is_success() => match response.str_field("status") {
            Some("busy") => Err(WitnessFailure::Busy),
            Some("ok") | None => parse_share(witness, &response.body),
            Some(other) => Err(WitnessFailure::Rejected(format!("status '{}'", other))),
        },
        status => Err(WitnessFailure::Rejected(format!("HTTP {}", status))),
    }
}

fn parse_share(witness: &str, body: &Value) -> Result<SignatureShare, WitnessFailure> {
    let malformed = |what: &str| WitnessFailure::Rejected(format!("response has no {}", what));

    let signature = body
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("signature"))?;
    let expected_expiration = match body.get("expectedExpiration") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| malformed("expectedExpiration"))?;
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("code"))?;

    let share = SignatureShare {
        witness: witness.to_string(),
        signature_hex: signature.to_string(),
        expected_expiration,
        code: code.to_string(),
    };
    share
        .split()
        .map_err(|e| WitnessFailure::Rejected(e.to_string()))?;
    Ok(share)
}
