//! The retry policy seam.
//!
//! The dispatch runtime owns only the loop contract: before every
//! re-attempt it asks the policy, and the policy either sleeps-and-permits
//! or hands the failure back as terminal. Backoff math lives entirely in
//! the policy.

use std::thread;
use std::time::Duration;

use crate::error::TransportError;

/// Produces per-call retry state.
///
/// One compiled client shares a single policy across all calls; each call
/// gets fresh attempt state from [`Retryer::begin`], so concurrent calls
/// never interfere.
pub trait Retryer: Send + Sync {
    /// Fresh attempt state for one call.
    fn begin(&self) -> Box<dyn RetryAttempt>;
}

/// Attempt state for a single call.
pub trait RetryAttempt: Send {
    /// Decides the fate of a retryable transport failure.
    ///
    /// `Ok(())` means the policy waited (if it wanted to) and another
    /// attempt may proceed.
    ///
    /// ## Errors
    ///
    /// Returns the failure back when attempts are exhausted; the runtime
    /// propagates it as terminal.
    fn continue_or_propagate(&mut self, err: TransportError) -> Result<(), TransportError>;
}

/// Bounded exponential backoff: up to `max_attempts` total attempts with
/// intervals growing by 1.5x from `period` to `max_period`.
#[derive(Debug, Clone)]
pub struct DefaultRetryer {
    period: Duration,
    max_period: Duration,
    max_attempts: usize,
}

impl DefaultRetryer {
    /// Creates a policy with explicit bounds.
    pub fn new(period: Duration, max_period: Duration, max_attempts: usize) -> Self {
        Self {
            period,
            max_period,
            max_attempts,
        }
    }
}

impl Default for DefaultRetryer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(1), 5)
    }
}

impl Retryer for DefaultRetryer {
    fn begin(&self) -> Box<dyn RetryAttempt> {
        Box::new(DefaultAttempt {
            policy: self.clone(),
            attempt: 1,
        })
    }
}

struct DefaultAttempt {
    policy: DefaultRetryer,
    attempt: usize,
}

impl DefaultAttempt {
    fn next_interval(&self) -> Duration {
        let multiplier = 1.5_f64.powi(self.attempt.saturating_sub(1) as i32);
        let interval = self.policy.period.mul_f64(multiplier);
        interval.min(self.policy.max_period)
    }
}

impl RetryAttempt for DefaultAttempt {
    fn continue_or_propagate(&mut self, err: TransportError) -> Result<(), TransportError> {
        if self.attempt >= self.policy.max_attempts {
            return Err(err);
        }
        let interval = self.next_interval();
        self.attempt += 1;
        thread::sleep(interval);
        Ok(())
    }
}

/// A policy that never permits a second attempt.
#[derive(Debug, Default)]
pub struct NeverRetry;

impl Retryer for NeverRetry {
    fn begin(&self) -> Box<dyn RetryAttempt> {
        Box::new(NeverAttempt)
    }
}

struct NeverAttempt;

impl RetryAttempt for NeverAttempt {
    fn continue_or_propagate(&mut self, err: TransportError) -> Result<(), TransportError> {
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;

    fn failure() -> TransportError {
        TransportError::new(TransportErrorKind::Connect, "refused", true)
    }

    #[test]
    fn test_default_retryer_permits_then_exhausts() {
        let policy = DefaultRetryer::new(Duration::from_millis(1), Duration::from_millis(2), 3);
        let mut attempt = policy.begin();
        assert!(attempt.continue_or_propagate(failure()).is_ok());
        assert!(attempt.continue_or_propagate(failure()).is_ok());
        assert!(attempt.continue_or_propagate(failure()).is_err());
    }

    #[test]
    fn test_attempt_state_is_per_call() {
        let policy = DefaultRetryer::new(Duration::from_millis(1), Duration::from_millis(1), 2);
        let mut first = policy.begin();
        assert!(first.continue_or_propagate(failure()).is_ok());
        assert!(first.continue_or_propagate(failure()).is_err());
        // a new call starts fresh
        let mut second = policy.begin();
        assert!(second.continue_or_propagate(failure()).is_ok());
    }

    #[test]
    fn test_never_retry_propagates_immediately() {
        let mut attempt = NeverRetry.begin();
        assert!(attempt.continue_or_propagate(failure()).is_err());
    }

    #[test]
    fn test_interval_is_capped() {
        let policy = DefaultRetryer::new(Duration::from_millis(100), Duration::from_millis(150), 10);
        let attempt = DefaultAttempt { policy, attempt: 6 };
        assert_eq!(attempt.next_interval(), Duration::from_millis(150));
    }
}
