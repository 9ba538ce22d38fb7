//! Bounded, immediate retries for pipeline stages

use crate::error::PullResult;
use tracing::warn;

/// How many times a stage may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// One retry right after the first failure
    pub const ONCE: Self = Self { max_attempts: 2 };

    /// Policy with `max_attempts` total attempts (at least one)
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number, so a stage can change its
/// strategy between attempts. There is no delay between attempts. The error
/// of the last attempt is returned; earlier errors are logged.
pub fn with_retry<T, F>(policy: RetryPolicy, stage: &str, mut op: F) -> PullResult<T>
where
    F: FnMut(u32) -> PullResult<T>,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                warn!("{} attempt {} failed, retrying: {}", stage, attempt, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
