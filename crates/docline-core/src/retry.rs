//! Retry with exponential backoff for backend requests and batch writes

use std::fmt::Display;
use std::io;
use std::time::Duration;

use crate::error::BackendError;

/// Errors that know whether another attempt can help.
pub trait Retryable: Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for BackendError {
    fn is_retryable(&self) -> bool {
        BackendError::is_retryable(self)
    }
}

impl Retryable for io::Error {
    fn is_retryable(&self) -> bool {
        !matches!(
            self.kind(),
            io::ErrorKind::StorageFull | io::ErrorKind::PermissionDenied
        )
    }
}

/// Bounded retry budget per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff: base * 2^(attempt-1) (2s, 4s, 8s, ... with the default base)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Retry a fallible operation with exponential backoff.
///
/// Retryable errors are logged and retried up to `policy.max_retries` times.
/// Returns the first success, or the final error on exhaustion or a
/// non-retryable error.
pub fn retry_with_backoff<T, E: Retryable>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                log::warn!(
                    "{label}: attempt {attempt}/{} failed: {e}, retrying in {delay:?}",
                    policy.max_retries
                );
                std::thread::sleep(delay);
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}
