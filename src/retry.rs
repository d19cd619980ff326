use crate::config::RetryConfig;
use crate::error::{FailureKind, ScrapeError};
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff around Retriable failures.
///
/// With the defaults an operation gets 5 tries; the waits before tries
/// 2..=5 are 2s, 4s, 8s and 16s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
    base_delay: Duration,
    factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_tries: u32, base_delay: Duration, factor: u32) -> Self {
        Self {
            max_tries: max_tries.max(1),
            base_delay,
            factor: factor.max(1),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_tries,
            Duration::from_millis(config.base_delay_ms),
            config.factor,
        )
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let multiplier = self.factor.saturating_pow(exponent);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Starts a fresh attempt counter
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempts: 0,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retriable error, or
    /// runs out of tries. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ScrapeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let mut backoff = self.backoff();
        loop {
            match op(backoff.attempts() + 1).await {
                Ok(value) => return Ok(value),
                Err(err) => backoff.wait(err).await?,
            }
        }
    }
}

/// Retry state for one wrapped call: how many attempts have failed so far
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a RetryPolicy,
    attempts: u32,
}

impl Backoff<'_> {
    /// Number of attempts that have failed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a failed attempt and decides what happens next.
    ///
    /// Returns the delay to wait before the next attempt, or the error that
    /// should end the wrapped call.
    pub fn next_delay(&mut self, err: ScrapeError) -> Result<Duration, ScrapeError> {
        self.attempts += 1;
        match err.kind() {
            FailureKind::Retriable if self.attempts < self.policy.max_tries => {
                Ok(self.policy.delay_for(self.attempts))
            }
            FailureKind::Retriable => Err(ScrapeError::RetriesExhausted {
                attempts: self.attempts,
                last: Box::new(err),
            }),
            FailureKind::Fatal | FailureKind::Other => Err(err),
        }
    }

    /// Records a failed attempt and sleeps before the next one, or returns
    /// the error that ends the call.
    pub async fn wait(&mut self, err: ScrapeError) -> Result<(), ScrapeError> {
        let reason = err.to_string();
        let delay = self.next_delay(err)?;
        ::log::warn!(
            "Attempt {}/{} failed ({}); retrying in {:.1}s",
            self.attempts,
            self.policy.max_tries,
            reason,
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
