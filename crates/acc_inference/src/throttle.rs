//! Rate limiting and retry for model calls.
//!
//! Hosted models reject bursts with 429s. `ThrottledModel` spaces calls out
//! with a governor limiter and retries failures, backing off exponentially
//! when the provider reports quota exhaustion.

use std::cmp::min;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use acc_core::{InferenceModel, Result};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Minimum spacing between consecutive calls.
    pub min_interval: Duration,
    /// First wait after a rate-limit error; doubles on each further one.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Wait after any other error.
    pub error_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(2),
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            error_delay: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// No waiting at all. Useful in tests.
    pub fn immediate() -> Self {
        Self {
            min_interval: Duration::ZERO,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            error_delay: Duration::ZERO,
            max_attempts: 5,
        }
    }
}

pub struct ThrottledModel {
    inner: Arc<dyn InferenceModel>,
    policy: RetryPolicy,
    limiter: Option<DefaultRateLimiter>,
    // Survives across calls so a throttled provider keeps getting longer pauses
    backoff: Mutex<Duration>,
}

impl ThrottledModel {
    pub fn new(inner: Arc<dyn InferenceModel>, policy: RetryPolicy) -> Self {
        let limiter = Quota::with_period(policy.min_interval).map(RateLimiter::direct);
        Self {
            inner,
            backoff: Mutex::new(policy.initial_backoff),
            policy,
            limiter,
        }
    }

    pub async fn current_backoff(&self) -> Duration {
        *self.backoff.lock().await
    }

    async fn next_backoff(&self) -> Duration {
        let mut backoff = self.backoff.lock().await;
        let wait = *backoff;
        *backoff = min(backoff.saturating_mul(2), self.policy.max_backoff);
        wait
    }
}

#[async_trait]
impl InferenceModel for ThrottledModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!("Rate limiting: waiting before next {} call", self.inner.name());
                limiter.until_ready().await;
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.generate(prompt).await {
                Ok(reply) => {
                    *self.backoff.lock().await = self.policy.initial_backoff;
                    return Ok(reply);
                }
                Err(e) if attempt >= self.policy.max_attempts => {
                    error!("API error after {} attempts: {}", attempt, e);
                    return Err(e);
                }
                Err(e) if e.is_rate_limited() => {
                    let wait = self.next_backoff().await;
                    warn!("Rate limit exceeded, backing off for {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    error!("API error: {}, retrying in {:?}", e, self.policy.error_delay);
                    tokio::time::sleep(self.policy.error_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acc_core::Error;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct FlakyModel {
        replies: StdMutex<VecDeque<Result<String>>>,
        calls: StdMutex<u32>,
    }

    impl FlakyModel {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                calls: StdMutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl InferenceModel for FlakyModel {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("done".to_string()))
        }
    }

    fn policy_with_backoff() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            ..RetryPolicy::immediate()
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = Arc::new(FlakyModel::new(vec![
            Err(Error::Inference("boom".to_string())),
            Err(Error::RateLimited("429".to_string())),
            Ok("YES".to_string()),
        ]));
        let model = ThrottledModel::new(inner.clone(), policy_with_backoff());

        assert_eq!(model.generate("prompt").await.unwrap(), "YES");
        assert_eq!(inner.calls(), 3);
        assert_eq!(model.current_backoff().await, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let replies = (0..10)
            .map(|_| Err(Error::RateLimited("429".to_string())))
            .collect();
        let inner = Arc::new(FlakyModel::new(replies));
        let model = ThrottledModel::new(inner.clone(), policy_with_backoff());

        let err = model.generate("prompt").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(inner.calls(), 5);
        assert_eq!(model.current_backoff().await, Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_backoff_doubles_and_caps() {
        let inner = Arc::new(FlakyModel::new(vec![]));
        let model = ThrottledModel::new(inner, policy_with_backoff());

        assert_eq!(model.next_backoff().await, Duration::from_millis(1));
        assert_eq!(model.next_backoff().await, Duration::from_millis(2));
        assert_eq!(model.next_backoff().await, Duration::from_millis(4));
        assert_eq!(model.next_backoff().await, Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_calls_respect_min_interval() {
        let inner = Arc::new(FlakyModel::new(vec![]));
        let policy = RetryPolicy {
            min_interval: Duration::from_millis(100),
            ..RetryPolicy::immediate()
        };
        let model = ThrottledModel::new(inner.clone(), policy);

        let started = std::time::Instant::now();
        model.generate("first").await.unwrap();
        model.generate("second").await.unwrap();
        model.generate("third").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(inner.calls(), 3);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.min_interval, Duration::from_secs(2));
        assert_eq!(policy.initial_backoff, Duration::from_secs(5));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
        assert_eq!(policy.error_delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_zero_interval_disables_limiter() {
        let inner = Arc::new(FlakyModel::new(vec![]));
        let model = ThrottledModel::new(inner, RetryPolicy::immediate());
        assert!(model.limiter.is_none());

        let inner = Arc::new(FlakyModel::new(vec![]));
        let model = ThrottledModel::new(inner, RetryPolicy::default());
        assert!(model.limiter.is_some());
    }
}
