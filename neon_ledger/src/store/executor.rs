//! Atomic unit executor
//!
//! Runs one unit of work under a deadline and transparently retries it when
//! a concurrent writer wins the race. Business-rule failures pass straight
//! through; they are never retried.

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::LedgerConfig;
use crate::errors::{LedgerError, LedgerResult};

/// Default attempts per unit (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default deadline for a single attempt (5 seconds)
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default base backoff between attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Retry and deadline policy for atomic units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: Duration,
}

impl Default for UnitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl From<&LedgerConfig> for UnitPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: Duration::from_millis(config.unit_timeout_ms),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl UnitPolicy {
    /// Linear backoff with up to 50% jitter so colliding writers spread out
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff.saturating_mul(attempt);
        let jitter_ms = base.as_millis() as u64 / 2;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// Execute an atomic unit with retry and timeout
///
/// `attempt` must build a fresh unit each time it is called. A timed-out
/// attempt is dropped before commit, which discards its staged writes.
///
/// # Arguments
///
/// * `policy` - Attempts, per-attempt deadline and backoff
/// * `operation` - Name used in logs and error messages
/// * `attempt` - Closure running one complete unit
///
/// # Returns
///
/// * `LedgerResult<T>` - Result of the first attempt that did not conflict
///
/// # Errors
///
/// * `LedgerError::StorageUnavailable` - Deadline exceeded or conflicts persisted
pub async fn run_unit<T, F, Fut>(
    policy: &UnitPolicy,
    operation: &str,
    mut attempt: F,
) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match timeout(policy.attempt_timeout, attempt()).await {
            Ok(Err(LedgerError::StorageConflict)) if tries < policy.max_attempts => {
                let delay = policy.delay(tries);
                debug!("{operation}: conflict on attempt {tries}, retrying in {delay:?}");
                sleep(delay).await;
            }
            Ok(Err(LedgerError::StorageConflict)) => {
                warn!("{operation}: giving up after {tries} conflicting attempts");
                return Err(LedgerError::StorageUnavailable(format!(
                    "{operation} kept conflicting after {tries} attempts"
                )));
            }
            Ok(result) => return result,
            Err(_) => {
                warn!(
                    "{operation}: attempt {tries} timed out after {:?}",
                    policy.attempt_timeout
                );
                return Err(LedgerError::StorageUnavailable(format!(
                    "{operation} timed out after {:?}",
                    policy.attempt_timeout
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> UnitPolicy {
        UnitPolicy {
            max_attempts,
            attempt_timeout: Duration::from_millis(200),
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = UnitPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.attempt_timeout.as_secs(), 5);
    }

    #[tokio::test]
    async fn test_conflict_is_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = run_unit(&fast_policy(5), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::StorageConflict)
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_escalates_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: LedgerResult<()> = run_unit(&fast_policy(3), "settle", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::StorageConflict)
        })
        .await;

        assert!(matches!(result, Err(LedgerError::StorageUnavailable(msg)) if msg.contains("settle")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: LedgerResult<()> = run_unit(&fast_policy(5), "debit", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::InvalidAmount(rust_decimal::Decimal::ZERO))
        })
        .await;

        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let result: LedgerResult<()> = run_unit(&fast_policy(3), "slow", || async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
