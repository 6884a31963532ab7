use std::time::Duration;

use tracing::debug;

use super::client::{ChatModel, LlmError};

/// Bounded exponential backoff for chat calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled each time
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32, err: &LlmError) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exp);
        let delay = match err.retry_after() {
            Some(hint) if hint > backoff => hint,
            _ => backoff,
        };
        delay.min(self.max_delay)
    }
}

/// Call the model, retrying rate limits and transient failures
///
/// Non-retryable errors return immediately; after `max_retries` retries the
/// last error is returned.
pub async fn complete_with_retry<M: ChatModel + ?Sized>(
    model: &M,
    prompt: &str,
    policy: &RetryPolicy,
    label: &str,
) -> Result<String, LlmError> {
    let mut retry = 0;
    loop {
        match model.complete(prompt).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_retryable() && retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_for(retry, &err);
                debug!(
                    "{}: {} (retry {} of {} in {:?})",
                    label, err, retry, policy.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed sequence of results
    struct Scripted {
        results: Mutex<Vec<Result<String, LlmError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut results: Vec<Result<String, LlmError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl ChatModel for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LlmError::Transient("exhausted".into())))
        }
    }

    fn rate_limited() -> LlmError {
        LlmError::RateLimited {
            retry_after: None,
            message: "429".into(),
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let err = LlmError::Transient("x".into());
        assert_eq!(policy.delay_for(1, &err), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, &err), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3, &err), Duration::from_secs(8));
        assert_eq!(policy.delay_for(30, &err), Duration::from_secs(60));
    }

    #[test]
    fn test_delay_honours_larger_retry_after() {
        let policy = RetryPolicy::default();
        let err = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(20)),
            message: String::new(),
        };
        assert_eq!(policy.delay_for(1, &err), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_recovers_after_rate_limit() {
        let model = Scripted::new(vec![Err(rate_limited()), Ok("done".into())]);
        let result = complete_with_retry(&model, "p", &fast_policy(3), "t").await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        let model = Scripted::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Ok("too late".into()),
        ]);
        let result = complete_with_retry(&model, "p", &fast_policy(2), "t").await;
        assert!(matches!(result, Err(LlmError::RateLimited { .. })));
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_fatal_errors() {
        let model = Scripted::new(vec![
            Err(LlmError::Api {
                status: 401,
                message: "bad key".into(),
            }),
            Ok("unreachable".into()),
        ]);
        let result = complete_with_retry(&model, "p", &fast_policy(3), "t").await;
        assert!(matches!(result, Err(LlmError::Api { status: 401, .. })));
        assert_eq!(model.calls(), 1);
    }
}
