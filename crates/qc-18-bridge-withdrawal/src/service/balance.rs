//! Withdrawal-token balance with a short-lived cache.

use crate::algorithms::{decode_allowance, erc20_balance_of};
use crate::domain::{Address, BalanceCache, BridgeError, CallRequest};
use crate::ports::outbound::WalletSigner;
use parking_lot::Mutex;
use primitive_types::U256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// `balanceOf` reader. One cached entry, keyed by owner.
///
/// A read that started before [`BalanceReader::invalidate`] returns its value
/// to the caller but never repopulates the cache.
pub struct BalanceReader {
    signer: Arc<dyn WalletSigner>,
    token: Address,
    ttl: Duration,
    cache: Mutex<Option<BalanceCache>>,
    generation: AtomicU64,
}

impl BalanceReader {
    /// Read balances of `token`, caching each for `ttl`.
    pub fn new(signer: Arc<dyn WalletSigner>, token: Address, ttl: Duration) -> Self {
        Self {
            signer,
            token,
            ttl,
            cache: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Cached value for `owner`, if still fresh.
    pub fn cached(&self, owner: &Address) -> Option<U256> {
        self.cache
            .lock()
            .filter(|c| c.owner == *owner && c.is_fresh(Instant::now(), self.ttl))
            .map(|c| c.amount)
    }

    /// Balance of `owner` in base units.
    pub async fn balance(&self, owner: &Address) -> Result<U256, BridgeError> {
        if let Some(amount) = self.cached(owner) {
            return Ok(amount);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let result = self
            .signer
            .call(CallRequest {
                from: None,
                to: self.token,
                data: erc20_balance_of(owner).to_hex(),
            })
            .await?;
        let amount = decode_allowance(&result)?;

        let mut cache = self.cache.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(owner = %owner, "[qc-18] Balance read outlived an invalidation, not caching");
            return Ok(amount);
        }
        debug!(owner = %owner, %amount, "[qc-18] Balance refreshed");
        *cache = Some(BalanceCache {
            owner: *owner,
            amount,
            captured_at: Instant::now(),
        });
        Ok(amount)
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *cache = None;
    }
}
