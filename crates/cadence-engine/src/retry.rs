//! Bounded exponential-backoff retry for one remote operation
//!
//! Only transient failures are retried. Terminal failures come back on the
//! first attempt, untouched. The executor keeps no state between calls.

use cadence_core::config::RetryConfig;
use cadence_core::{CadenceError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy shared by every invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

/// One attempt of one invocation
#[derive(Debug, Clone)]
pub struct RetryAttempt<'a> {
    pub operation: &'a str,
    pub number: u32,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl RetryAttempt<'_> {
    /// Delay to wait after this attempt fails: `base × multiplier^(number-1)`
    pub fn delay(&self) -> Duration {
        let exponent = self.number.saturating_sub(1) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    pub fn is_last(&self) -> bool {
        self.number >= self.max_attempts
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.multiplier)
    }

    fn attempt<'a>(&self, operation: &'a str, number: u32) -> RetryAttempt<'a> {
        RetryAttempt {
            operation,
            number,
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            multiplier: self.multiplier,
        }
    }

    /// Run `op`, retrying transient failures
    pub async fn execute<F, Fut, T>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with(operation, op, |_, _| {}).await
    }

    /// Like [`execute`](Self::execute), calling `on_retry` before each backoff sleep
    pub async fn execute_with<F, Fut, T, N>(
        &self,
        operation: &str,
        mut op: F,
        mut on_retry: N,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        N: FnMut(&RetryAttempt<'_>, &CadenceError),
    {
        let mut attempt = self.attempt(operation, 1);

        loop {
            match op().await {
                Ok(value) => {
                    if attempt.number > 1 {
                        debug!(
                            "{} succeeded on attempt {}/{}",
                            operation, attempt.number, attempt.max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && !attempt.is_last() => {
                    let delay = attempt.delay();
                    warn!(
                        operation,
                        attempt = attempt.number,
                        max_attempts = attempt.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    on_retry(&attempt, &err);
                    tokio::time::sleep(delay).await;
                    attempt = self.attempt(operation, attempt.number + 1);
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(
                            "{} failed after {} attempts: {}",
                            operation, attempt.number, err
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
