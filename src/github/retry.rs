use reqwest::StatusCode;
use std::time::Duration;

use crate::github::executor::{ApiResponse, FailureReason, RequestOutcome};

/// Retry and rate-limit waiting rules shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt for retryable failures.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Upper bound for a single rate-limit wait.
    pub max_rate_limit_wait: Duration,
    /// Consecutive rate-limit waits tolerated before giving up.
    pub max_rate_limit_waits: u32,
    pub low_remaining_threshold: u32,
    pub low_remaining_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_rate_limit_wait: Duration::from_secs(300),
            max_rate_limit_waits: 20,
            low_remaining_threshold: 10,
            low_remaining_pause: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Classification of a single attempt.
#[derive(Debug, Clone)]
pub enum AttemptResult {
    Success(ApiResponse),
    RateLimited { retry_after: Duration },
    Terminal(StatusCode),
    Retryable(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    RateLimit,
    Backoff,
}

#[derive(Debug, Clone)]
pub enum ExecutorState {
    Attempting,
    Waiting(WaitReason, Duration),
    Done(RequestOutcome),
}

/// Bookkeeping for one logical request.
///
/// `advance` is pure: it consumes an attempt result and yields the next
/// state, leaving the actual sleeping to the caller.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    retries: u32,
    rate_limit_waits: u32,
    delay: Duration,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        let delay = policy.initial_delay;
        Self {
            policy,
            retries: 0,
            rate_limit_waits: 0,
            delay,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    pub fn advance(&mut self, result: AttemptResult) -> ExecutorState {
        match result {
            AttemptResult::Success(response) => {
                ExecutorState::Done(RequestOutcome::Success(response))
            }
            AttemptResult::Terminal(status) => {
                ExecutorState::Done(RequestOutcome::TerminalClientError(status))
            }
            AttemptResult::RateLimited { retry_after } => {
                let wait = retry_after
                    .max(self.delay)
                    .min(self.policy.max_rate_limit_wait);
                self.rate_limit_waits += 1;
                if self.rate_limit_waits > self.policy.max_rate_limit_waits {
                    return ExecutorState::Done(RequestOutcome::RateLimited(wait));
                }
                self.delay = self.policy.initial_delay;
                ExecutorState::Waiting(WaitReason::RateLimit, wait)
            }
            AttemptResult::Retryable(reason) => {
                self.retries += 1;
                if self.retries > self.policy.max_retries {
                    return ExecutorState::Done(RequestOutcome::RetryableFailure(reason));
                }
                let wait = self.delay.min(self.policy.max_delay);
                self.delay = self
                    .delay
                    .mul_f64(self.policy.backoff_multiplier)
                    .min(self.policy.max_delay);
                ExecutorState::Waiting(WaitReason::Backoff, wait)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff_waits(state: &mut RetryState, failures: usize) -> Vec<Duration> {
        (0..failures)
            .filter_map(|_| match state.advance(AttemptResult::Retryable(FailureReason::Timeout)) {
                ExecutorState::Waiting(WaitReason::Backoff, d) => Some(d),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_backoff_is_non_decreasing_and_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            max_delay: Duration::from_secs(8),
            ..RetryPolicy::default()
        };
        let mut state = RetryState::new(policy);
        let waits = backoff_waits(&mut state, 10);

        assert_eq!(waits.len(), 10);
        assert!(waits.windows(2).all(|w| w[0] <= w[1]));
        assert!(waits.iter().all(|d| *d <= Duration::from_secs(8)));
        assert_eq!(waits[..4], [1, 2, 4, 8].map(Duration::from_secs));
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let mut state = RetryState::new(RetryPolicy::default().with_max_retries(3));
        assert_eq!(backoff_waits(&mut state, 3).len(), 3);

        match state.advance(AttemptResult::Retryable(FailureReason::Timeout)) {
            ExecutorState::Done(RequestOutcome::RetryableFailure(FailureReason::Timeout)) => {}
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_wait_does_not_consume_budget() {
        let mut state = RetryState::new(RetryPolicy::default().with_max_retries(2));
        for _ in 0..5 {
            let next = state.advance(AttemptResult::RateLimited {
                retry_after: Duration::from_secs(30),
            });
            assert!(matches!(
                next,
                ExecutorState::Waiting(WaitReason::RateLimit, d) if d == Duration::from_secs(30)
            ));
        }
        assert_eq!(state.retries(), 0);
    }

    #[test]
    fn test_rate_limit_wait_uses_larger_of_hint_and_backoff() {
        let mut state = RetryState::new(RetryPolicy::default());
        backoff_waits(&mut state, 3);
        assert_eq!(state.current_delay(), Duration::from_secs(8));

        let next = state.advance(AttemptResult::RateLimited {
            retry_after: Duration::from_secs(2),
        });
        assert!(matches!(
            next,
            ExecutorState::Waiting(WaitReason::RateLimit, d) if d == Duration::from_secs(8)
        ));
        assert_eq!(state.current_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_rate_limit_wait_is_capped() {
        let mut state = RetryState::new(RetryPolicy::default());
        let next = state.advance(AttemptResult::RateLimited {
            retry_after: Duration::from_secs(3600),
        });
        assert!(matches!(
            next,
            ExecutorState::Waiting(WaitReason::RateLimit, d) if d == Duration::from_secs(300)
        ));
    }

    #[test]
    fn test_rate_limit_waits_are_bounded() {
        let policy = RetryPolicy {
            max_rate_limit_waits: 2,
            ..RetryPolicy::default()
        };
        let mut state = RetryState::new(policy);
        let limited = || AttemptResult::RateLimited {
            retry_after: Duration::from_secs(5),
        };

        assert!(matches!(state.advance(limited()), ExecutorState::Waiting(..)));
        assert!(matches!(state.advance(limited()), ExecutorState::Waiting(..)));
        assert!(matches!(
            state.advance(limited()),
            ExecutorState::Done(RequestOutcome::RateLimited(_))
        ));
    }
}
