//! Backoff policies
//!
//! Two flavours live here:
//! - [`retry_with_backoff`] retries an async operation in place, for startup
//!   work such as installing the CRD while the API server warms up.
//! - [`FailureBackoff`] tracks consecutive reconcile failures per fleet and
//!   turns them into requeue delays. The reconciler itself never retries; it
//!   surfaces the error and the controller redelivers the trigger after the
//!   delay computed here.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tracing::{error, warn};

/// Configuration for operations that may fail transiently.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0, // infinite
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with a maximum number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }
}

/// Execute an async operation with exponential backoff and jitter.
///
/// Retries indefinitely (or up to max_attempts if set) until success and
/// returns the last error once max_attempts is exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if config.max_attempts > 0 && attempt >= config.max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                // 0.5x to 1.5x of the delay
                let jitter = rand::thread_rng().gen_range(0.5..1.5);
                let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = jittered_delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(jittered_delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}

/// Per-key exponential backoff for failed reconciles
///
/// The delay after `n` consecutive failures is `base * 2^(n-1)`, capped at
/// `max`. Permanent errors go straight to `max` since retrying sooner cannot
/// help until the RedisFleet spec changes.
#[derive(Debug)]
pub struct FailureBackoff {
    base: Duration,
    max: Duration,
    failures: DashMap<String, u32>,
}

impl FailureBackoff {
    /// Create a tracker with the given base and maximum delay
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: DashMap::new(),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying
    pub fn on_failure(&self, key: &str, retryable: bool) -> Duration {
        let mut entry = self.failures.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(1);
        if retryable {
            self.delay_for(*entry)
        } else {
            self.max
        }
    }

    /// Forget the failure history of `key` after a successful reconcile
    pub fn on_success(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Consecutive failures recorded for `key`
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).map(|f| *f).unwrap_or(0)
    }

    /// Delay after `failures` consecutive failures
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }
}
