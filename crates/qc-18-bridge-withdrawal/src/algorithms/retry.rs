//! # Retry Scheduling
//!
//! Linear backoff owned by the operation that awaits it. The delay is a
//! `tokio::time::sleep` inside the retrying future, so dropping the future
//! cancels the pending retry with it.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Linear backoff: attempt `n` (1-based) waits `n * backoff_step` before retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay multiplied by the attempt number.
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Create a retry policy.
    pub fn new(max_retries: u32, backoff_step: Duration) -> Self {
        Self {
            max_retries,
            backoff_step,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before the retry that follows attempt `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }

    /// First attempt plus retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Outcome of one attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// Finished successfully.
    Done(T),
    /// Failed in a way worth repeating.
    Retry(E),
    /// Failed for good.
    Fail(E),
}

/// Why a retried operation gave up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt asked to be retried.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: E,
    },
    /// An attempt failed terminally.
    Fatal {
        /// Attempts made, including the fatal one.
        attempts: u32,
        /// The terminal error.
        error: E,
    },
}

impl<E> RetryError<E> {
    /// Underlying error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Fatal { error, .. } => error,
        }
    }

    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Fatal { attempts, .. } => *attempts,
        }
    }
}

/// Run `op` until it is done, fails terminally, or runs out of attempts.
///
/// `op` receives the 1-based attempt number.
pub async fn run_with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fail(error) => return Err(RetryError::Fatal { attempts: attempt, error }),
            Attempt::Retry(last) => {
                if attempt >= policy.max_attempts() {
                    return Err(RetryError::Exhausted { attempts: attempt, last });
                }
                sleep(policy.backoff_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}
