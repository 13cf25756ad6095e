//! Bounded retry with exponential backoff for remote calls

use super::RemoteError;
use crate::engine::CancellationScope;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How often and how patiently a remote call is repeated.
///
/// Only errors reported as retryable by [`RemoteError::is_retryable`] are
/// repeated; everything else is returned on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 4_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The scope is checked before every attempt and wakes the backoff
    /// sleep, so a cancelled scope never issues another request.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        scope: &CancellationScope,
        mut op: F,
    ) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            if scope.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        "{label}: attempt {attempt}/{max_attempts} failed ({err}), retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::select! {
                        biased;
                        _ = scope.cancelled() => {
                            tracing::debug!("{label}: scope {} cancelled during backoff", scope.id());
                            return Err(RemoteError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
