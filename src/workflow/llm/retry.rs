//! Exponential-backoff retry policy, applied only to transient failures.

use std::time::Duration;

use super::gateway::LlmError;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, attempt: u32, error: &LlmError) -> bool {
        attempt < self.max_attempts && matches!(error, LlmError::Transient(_))
    }

    /// Exponential backoff: `base * 2^(attempt-1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_retry_permanent_errors() {
        let policy = RetryPolicy::default();
        let err = LlmError::Permanent("bad api key".into());
        assert!(!policy.should_retry(1, &err));
    }

    #[test]
    fn retries_transient_up_to_max_attempts() {
        let policy = RetryPolicy::default();
        let err = LlmError::Transient("503".into());
        assert!(policy.should_retry(1, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
    }
}
