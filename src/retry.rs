//! Bounded exponential backoff for dictionary fetches.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    /// Growth factor applied to the wait after each failure
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// 3 attempts, waiting 200ms then 400ms.
    ///
    /// A switch is user-initiated; past this point falling back to the
    /// default text beats waiting.
    pub fn dictionary_fetch() -> Self {
        Self::new(3, Duration::from_millis(200)).with_max_delay(Duration::from_secs(1))
    }

    /// No retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before attempt `attempt` (0-indexed). Zero for the first one.
    fn backoff(&self, attempt: u32) -> Duration {
        let Some(retry) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = self.backoff_multiplier.powi(retry as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::dictionary_fetch()
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects the error,
/// or the attempts run out. The last error is returned.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let wait = config.backoff(attempt);
        if !wait.is_zero() {
            debug!("{}: waiting {:?} before attempt {}/{}", label, wait, attempt + 1, attempts);
            sleep(wait).await;
        }

        let error = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{}: succeeded on attempt {}/{}", label, attempt + 1, attempts);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        attempt += 1;
        if !should_retry(&error) {
            debug!("{}: giving up on non-retryable error: {}", label, error);
            return Err(error);
        }
        if attempt >= attempts {
            warn!("{}: failed after {} attempts: {}", label, attempts, error);
            return Err(error);
        }
        warn!(
            "{}: attempt {}/{} failed ({}), retrying",
            label, attempt, attempts, error
        );
    }
}
