//! Optimistic concurrency retry.
//!
//! A read-modify-write that loses a version race is rerun from scratch,
//! re-reading fresh versions, after a randomized exponential backoff. Only
//! errors that report themselves as [`Retryable`] are rerun; everything else
//! returns immediately.
//!
//! ```ignore
//! let policy = RetryPolicy::builder()
//!     .max_attempts(5)
//!     .initial_delay(Duration::from_millis(5))
//!     .build();
//!
//! let cart = retry_on_conflict(&policy, |attempt| load_modify_commit(attempt))?;
//! ```

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::error::CartError;

/// Errors that may succeed when the whole operation is rerun.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CartError {
    fn is_retryable(&self) -> bool {
        CartError::is_retryable(self)
    }
}

/// Bounded retry with exponential backoff and jitter.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `initial_delay`: 5ms
/// - `max_delay`: 200ms
/// - `multiplier`: 2.0
/// - `jitter`: 0.5 (each delay is scaled by a random factor in `[0.5, 1.0]`)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of each delay that may be randomly shaved off, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(200),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: RetryPolicy::default(),
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the attempt after `attempt` (1-based), without jitter.
    ///
    /// `initial_delay * multiplier^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ns = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);

        if !delay_ns.is_finite() || delay_ns >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(delay_ns.max(0.0) as u64)
    }

    /// Jittered delay actually slept after a failed `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.delay_for_attempt(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || base.is_zero() {
            return base;
        }
        let factor = rand::thread_rng().gen_range((1.0 - jitter)..=1.0);
        Duration::from_nanos((base.as_nanos() as f64 * factor) as u64)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts.max(1);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    pub fn jitter(mut self, jitter: f64) -> Self {
        self.policy.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up.
///
/// `operation` receives the 1-based attempt number. The last error is
/// returned on exhaustion.
pub fn retry_on_conflict<T, E, F>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= max_attempts {
                    tracing::warn!(attempt, error = %err, "giving up after max attempts");
                    return Err(err);
                }

                let delay = policy.backoff_for(attempt);
                tracing::debug!(
                    attempt,
                    delay_us = delay.as_micros() as u64,
                    error = %err,
                    "conflict, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
