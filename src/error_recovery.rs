// src/error_recovery.rs
//! Retry with exponential backoff for API operations.
//!
//! Retrying is an explicit state machine ([`RetryState`]) so the decision
//! for each failure can be tested without a clock, and waiting goes through
//! a [`Sleeper`] so tests can observe delays instead of serving them.

use crate::constants::{
    DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, MAX_RETRY_AFTER,
};
use crate::error::ApiError;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Whether replaying a request that may already have been applied is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Reads: an ambiguous failure is retried like a transient one.
    Safe,
    /// Writes: an ambiguous failure is returned to the caller.
    Unsafe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Bounded-attempt retry state for one operation.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    failures: u32,
    backoff: Duration,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
            backoff: policy.initial_backoff,
        }
    }

    /// Failed attempts recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a failed attempt and decides what to do next.
    pub fn on_failure(&mut self, error: &ApiError, replay: Replay) -> RetryDecision {
        self.failures += 1;

        let retryable =
            error.is_retryable() || (replay == Replay::Safe && error.is_ambiguous());
        if !retryable || self.failures >= self.policy.max_attempts.max(1) {
            return RetryDecision::GiveUp;
        }

        let delay = match error.retry_after() {
            Some(requested) => requested.min(MAX_RETRY_AFTER),
            None => with_jitter(self.backoff),
        };
        self.backoff = (self.backoff * 2).min(self.policy.max_backoff);
        RetryDecision::RetryAfter(delay)
    }
}

/// Half the backoff fixed, half random.
fn with_jitter(backoff: Duration) -> Duration {
    let millis = backoff.as_millis() as u64;
    let half = millis / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(millis - half + jitter)
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `operation` until it succeeds, fails terminally, or the policy runs out.
/// The last error is returned unmodified.
pub async fn retry_with_backoff<F, T, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    replay: Replay,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut state = RetryState::new(*policy);

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => match state.on_failure(&e, replay) {
                RetryDecision::RetryAfter(delay) => {
                    log::warn!(
                        "{} failed (attempt {}/{}): {}; retrying after {:?}",
                        operation_name,
                        state.failures(),
                        policy.max_attempts,
                        e,
                        delay
                    );
                    sleeper.sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    if state.failures() > 1 {
                        log::warn!(
                            "{} giving up after {} attempts: {}",
                            operation_name,
                            state.failures(),
                            e
                        );
                    }
                    return Err(e);
                }
            },
        }
    }
}
