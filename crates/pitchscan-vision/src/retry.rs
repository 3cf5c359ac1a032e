//! Retry policy with exponential backoff.
//!
//! Delays are a pure function of the attempt number; the wait itself goes
//! through a [`Sleeper`] so retry loops can be driven without real time.

use async_trait::async_trait;
use std::time::Duration;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per frame, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_delay: Duration,
    /// Cap applied to every delay, server hints included
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay after the failed attempt `attempt` (0-based): base * 2^attempt, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .map(|factor| self.base_delay.saturating_mul(factor))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Backoff delay, lengthened to a server hint when one is given.
    pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.delay_for_attempt(attempt);
        match hint {
            Some(hint) => backoff.max(hint).min(self.max_delay),
            None => backoff,
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<S: Sleeper + ?Sized> Sleeper for std::sync::Arc<S> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
