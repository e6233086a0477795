// ABOUTME: Retry-with-backoff primitive shared by every generation stage
// ABOUTME: Retries only errors a caller-supplied predicate classifies as transient

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// How many times to attempt an operation and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 is treated as 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Random spread applied to each delay, clamped to [0, 1]
    pub jitter_factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Computes exponential backoff with optional jitter.
#[derive(Debug, Clone)]
pub struct BackoffCalculator;

impl BackoffCalculator {
    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn calculate_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = policy.base_delay.saturating_mul(factor);

        let jitter = policy.jitter_factor.clamp(0.0, 1.0);
        if jitter > 0.0 {
            let scale: f32 = rand::thread_rng().gen_range(-jitter..=jitter);
            return delay.mul_f32((1.0 + scale).max(0.0));
        }

        delay
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up. The last error is returned as-is.
///
/// `operation` receives the 1-based attempt number.
pub async fn with_retry<Op, Fut, T, E, IsRetryable>(
    policy: &RetryPolicy,
    is_retryable: IsRetryable,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    IsRetryable: Fn(&E) -> bool,
    E: Display,
{
    let max = policy.effective_attempts();
    let mut attempt: u32 = 1;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !is_retryable(&error) {
            debug!(attempt, "Non-retryable error, failing fast: {}", error);
            return Err(error);
        }

        if attempt >= max {
            warn!(attempts = attempt, "Retry attempts exhausted: {}", error);
            return Err(error);
        }

        let delay = BackoffCalculator::calculate_delay(policy, attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Retry backoff: {}",
            error
        );
        tokio::time::sleep(delay).await;

        attempt += 1;
    }
}
