// src/provider/retry.rs — Retry with exponential backoff for model providers
//
// Wraps any ModelProvider with automatic retry on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts, connection failures.
// Does NOT retry: bad request (400), auth errors (401, 403), empty replies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider};
use crate::infra::errors::StoryError;

const BACKOFF_FACTOR: f64 = 2.0;
const JITTER_FRACTION: f64 = 0.2;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_factor: BACKOFF_FACTOR,
            max_delay,
            jitter_fraction: JITTER_FRACTION,
        }
    }

    pub fn categorizer() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30))
    }

    pub fn storyteller() -> Self {
        Self::new(3, Duration::from_secs(2), Duration::from_secs(60))
    }

    pub fn judge() -> Self {
        Self::new(3, Duration::from_secs(2), Duration::from_secs(60))
    }

    pub fn safety() -> Self {
        Self::new(2, Duration::from_secs(1), Duration::from_secs(20))
    }
}

/// A provider wrapper that adds retry with exponential backoff.
pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    config: RetryConfig,
}

impl RetryProvider {
    pub fn with_config(inner: Arc<dyn ModelProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        // Honor the server's hint, but never wait longer than our own cap.
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay.min(self.config.max_delay);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(1.0);

        Duration::from_millis(final_ms as u64)
    }
}

fn should_retry(error: &StoryError) -> bool {
    error.is_retriable()
}

fn rate_limit_delay(error: &StoryError) -> Option<Duration> {
    match error {
        StoryError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter so retry timing is reproducible in tests.
/// Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, StoryError> {
        let mut attempt = 0;
        loop {
            match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !should_retry(&e) || attempt + 1 >= self.config.max_attempts {
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        provider = self.inner.id(),
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StopReason, TokenUsage};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the given error `failures` times, then succeeds.
    struct FlakyProvider {
        failures: u32,
        retriable: bool,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32, retriable: bool) -> Self {
            Self {
                failures,
                retriable,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for FlakyProvider {
        fn id(&self) -> &str {
            "flaky"
        }
        fn name(&self) -> &str {
            "Flaky"
        }
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, StoryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(StoryError::Provider {
                    provider: "flaky".into(),
                    message: "HTTP 503".into(),
                    retriable: self.retriable,
                });
            }
            Ok(ChatResponse {
                content: "ok".into(),
                usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = Arc::new(FlakyProvider::new(2, true));
        let provider = RetryProvider::with_config(inner.clone(), fast_config(3));
        let resp = provider.chat(ChatRequest::default()).await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = Arc::new(FlakyProvider::new(10, true));
        let provider = RetryProvider::with_config(inner.clone(), fast_config(3));
        assert!(provider.chat(ChatRequest::default()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retriable_fails_immediately() {
        let inner = Arc::new(FlakyProvider::new(1, false));
        let provider = RetryProvider::with_config(inner.clone(), fast_config(3));
        assert!(provider.chat(ChatRequest::default()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rate_limit_delay_extraction() {
        let err = StoryError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 3000,
        };
        assert_eq!(rate_limit_delay(&err), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_rate_limit_delay_zero() {
        let err = StoryError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 0,
        };
        assert!(rate_limit_delay(&err).is_none());
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let provider = RetryProvider::with_config(
            Arc::new(FlakyProvider::new(0, true)),
            RetryConfig::judge(),
        );
        let d0 = provider.delay_for_attempt(0, None);
        let d1 = provider.delay_for_attempt(1, None);
        let d2 = provider.delay_for_attempt(2, None);

        // d0 ≈ 2000ms, d1 ≈ 4000ms, d2 ≈ 8000ms (±20% jitter)
        assert!(d0.as_millis() >= 1600 && d0.as_millis() <= 2400);
        assert!(d1.as_millis() >= 3200 && d1.as_millis() <= 4800);
        assert!(d2.as_millis() >= 6400 && d2.as_millis() <= 9600);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let provider = RetryProvider::with_config(
            Arc::new(FlakyProvider::new(0, true)),
            RetryConfig::safety(),
        );
        let d = provider.delay_for_attempt(10, None);
        assert!(d.as_millis() <= 24_000);
    }

    #[test]
    fn test_rate_limit_hint_capped() {
        let provider = RetryProvider::with_config(
            Arc::new(FlakyProvider::new(0, true)),
            RetryConfig::safety(),
        );
        let d = provider.delay_for_attempt(0, Some(Duration::from_secs(120)));
        assert_eq!(d, Duration::from_secs(20));
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!((0.8..=1.2).contains(&j), "jitter {} out of range", j);
        }
    }

    #[test]
    fn test_role_presets() {
        assert_eq!(RetryConfig::categorizer().max_attempts, 3);
        assert_eq!(RetryConfig::categorizer().max_delay, Duration::from_secs(30));
        assert_eq!(RetryConfig::storyteller().initial_delay, Duration::from_secs(2));
        assert_eq!(RetryConfig::safety().max_attempts, 2);
        assert_eq!(RetryConfig::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }
}
