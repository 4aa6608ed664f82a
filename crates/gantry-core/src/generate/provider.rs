//! Provider abstraction and the bounded retry machine around it.
//!
//! A [`TextGenerator`] is any backend that turns a prompt into text. The
//! retry machine wraps a single provider call with a per-call timeout,
//! a bounded retry budget with doubling backoff, and cancellation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::cancel::CancelToken;
use crate::domain::ProviderError;

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Backend model identifier, recorded in artifact provenance.
    fn model_name(&self) -> &str;
}

/// Retry budget for provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = max_retries + 1.
    pub max_retries: u32,
    /// Per-call timeout.
    pub call_timeout: Duration,
    /// First backoff delay; doubles per retry.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            call_timeout: Duration::from_secs(120),
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(retry)
    }
}

/// Where the retry machine ended up.
#[derive(Debug)]
pub enum RetryOutcome {
    /// A call succeeded; carries the raw response and how many attempts it took.
    Succeeded { response: String, attempts: u32 },
    /// The budget ran out; carries the last provider error.
    Exhausted { last_error: ProviderError, attempts: u32 },
    /// The caller cancelled while a call or backoff was in flight.
    Cancelled,
}

enum GenState {
    Attempting { attempt: u32 },
    Retrying { next_attempt: u32, delay: Duration, last_error: ProviderError },
    Succeeded { response: String, attempts: u32 },
    Failed { last_error: ProviderError, attempts: u32 },
}

fn retryable(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::Timeout | ProviderError::RateLimited | ProviderError::Transport(_)
    )
}

/// Drive one prompt through the provider under `policy`.
///
/// Non-retryable errors ([`ProviderError::InvalidResponse`]) fail
/// immediately without consuming the remaining budget. Cancellation is
/// observed both mid-call and mid-backoff.
pub async fn generate_with_retry(
    provider: &dyn TextGenerator,
    prompt: &str,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> RetryOutcome {
    let mut state = GenState::Attempting { attempt: 1 };

    loop {
        state = match state {
            GenState::Attempting { attempt } => {
                if cancel.is_cancelled() {
                    return RetryOutcome::Cancelled;
                }
                let call = tokio::time::timeout(policy.call_timeout, provider.generate(prompt));
                let result = tokio::select! {
                    _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                    result = call => result,
                };
                let err = match result {
                    Ok(Ok(response)) => {
                        state = GenState::Succeeded { response, attempts: attempt };
                        continue;
                    }
                    Ok(Err(e)) => e,
                    Err(_) => ProviderError::Timeout,
                };
                let retries_used = attempt - 1;
                if retryable(&err) && retries_used < policy.max_retries {
                    GenState::Retrying {
                        next_attempt: attempt + 1,
                        delay: policy.backoff_for(retries_used),
                        last_error: err,
                    }
                } else {
                    GenState::Failed { last_error: err, attempts: attempt }
                }
            }
            GenState::Retrying { next_attempt, delay, last_error } => {
                warn!(
                    event = "provider.retry",
                    attempt = next_attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %last_error,
                );
                tokio::select! {
                    _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
                GenState::Attempting { attempt: next_attempt }
            }
            GenState::Succeeded { response, attempts } => {
                return RetryOutcome::Succeeded { response, attempts };
            }
            GenState::Failed { last_error, attempts } => {
                return RetryOutcome::Exhausted { last_error, attempts };
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: AtomicU32,
        fail_first: u32,
        error: ProviderError,
    }

    #[async_trait]
    impl TextGenerator for FlakyProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(self.error.clone())
            } else {
                Ok("FROM node:20\n".to_string())
            }
        }

        fn model_name(&self) -> &str {
            "flaky-test"
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            call_timeout: Duration::from_secs(1),
            backoff_base: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_within_budget_after_transient_failures() {
        let provider = FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: 2,
            error: ProviderError::Timeout,
        };
        let outcome =
            generate_with_retry(&provider, "p", &fast_policy(), &CancelToken::new()).await;
        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausts_budget_on_persistent_failure() {
        let provider = FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            error: ProviderError::RateLimited,
        };
        let outcome =
            generate_with_retry(&provider, "p", &fast_policy(), &CancelToken::new()).await;
        match outcome {
            RetryOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last_error, ProviderError::RateLimited));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalid_response_fails_without_retry() {
        let provider = FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            error: ProviderError::InvalidResponse("garbage".into()),
        };
        let outcome =
            generate_with_retry(&provider, "p", &fast_policy(), &CancelToken::new()).await;
        match outcome {
            RetryOutcome::Exhausted { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_retrying() {
        let provider = FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            error: ProviderError::Timeout,
        };
        let policy = RetryPolicy {
            max_retries: 5,
            call_timeout: Duration::from_secs(1),
            backoff_base: Duration::from_secs(60),
        };
        let cancel = CancelToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move {
            // First call fails immediately; the machine is now parked in
            // its 60s backoff when we cancel.
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel_clone.cancel();
        });
        let outcome = generate_with_retry(&provider, "p", &policy, &cancel).await;
        handle.await.unwrap();
        assert!(matches!(outcome, RetryOutcome::Cancelled));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
