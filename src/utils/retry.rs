// src/utils/retry.rs

//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::{AppError, Result};

// Caps the backoff multiplier at 2^10 so long retry chains stay sane.
const MAX_BACKOFF_EXP: u32 = 10;

/// Explicit retry policy: how many attempts, and the base delay that
/// doubles after each failed one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run `op` until it succeeds, `should_retry` rejects the error, or
    /// attempts are exhausted. The last error is returned as-is.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        should_retry: impl Fn(&AppError) -> bool,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= attempts || !should_retry(&err) {
                        return Err(err);
                    }
                    let delay = self.base_delay * (1u32 << (attempt - 1).min(MAX_BACKOFF_EXP));
                    warn!(
                        "{label}: attempt {attempt}/{attempts} failed ({err}), retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
