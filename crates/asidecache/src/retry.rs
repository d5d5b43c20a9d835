//! Bounded retry with exponential backoff for backend calls

use std::time::{Duration, Instant};
use tracing::warn;

/// How often and how patiently a failed backend call is retried.
///
/// Only retryable failures (unavailable backend, timeout) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first; at least 1
    pub max_attempts: u32,
    /// Sleep before the second attempt
    pub base_backoff: Duration,
    /// Upper bound on any single sleep
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sleep before attempt number `attempt + 1` (`attempt` starts at 1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `call` until it succeeds, fails permanently or attempts run out.
    ///
    /// Returns the outcome together with the time spent inside `call`
    /// itself; backoff sleeps are not counted.
    pub(crate) fn run<T>(
        &self,
        what: &'static str,
        mut call: impl FnMut() -> asidestore::Result<T>,
    ) -> (asidestore::Result<T>, Duration) {
        let mut spent = Duration::ZERO;
        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let outcome = call();
            spent += started.elapsed();

            match outcome {
                Err(err) if err.is_retryable() && attempt < self.max_attempts.max(1) => {
                    let pause = self.backoff(attempt);
                    warn!(
                        op = what,
                        attempt,
                        backoff_ms = pause.as_millis() as u64,
                        error = %err,
                        "retrying backend call"
                    );
                    std::thread::sleep(pause);
                    attempt += 1;
                }
                outcome => return (outcome, spent),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asidestore::Error;

    fn unavailable() -> Error {
        Error::Unavailable {
            backend: "memory",
            reason: "down".into(),
        }
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
        assert_eq!(policy.backoff(40), Duration::from_secs(1));
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let mut calls = 0;
        let (outcome, _) = fast(3).run("get", || {
            calls += 1;
            if calls < 3 { Err(unavailable()) } else { Ok(7) }
        });

        assert_eq!(outcome.unwrap(), 7);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let (outcome, _) = fast(2).run("get", || -> asidestore::Result<()> {
            calls += 1;
            Err(unavailable())
        });

        assert!(matches!(outcome, Err(Error::Unavailable { .. })));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_permanent_failure_not_retried() {
        let mut calls = 0;
        let (outcome, _) = fast(5).run("upsert", || -> asidestore::Result<()> {
            calls += 1;
            Err(Error::ConstraintViolation {
                backend: "memory",
                key: "k1".into(),
            })
        });

        assert!(outcome.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_none_is_single_attempt() {
        let mut calls = 0;
        let (outcome, _) = RetryPolicy::none().run("get", || -> asidestore::Result<()> {
            calls += 1;
            Err(unavailable())
        });

        assert!(outcome.is_err());
        assert_eq!(calls, 1);
    }
}
