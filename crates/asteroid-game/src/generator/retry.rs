use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use asteroid_core::config::RetryConfig;
use asteroid_core::error::Result;
use asteroid_core::traits::Generator;
use asteroid_core::types::Turn;

/// A generator that retries transient failures with exponential backoff.
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    retry_config: RetryConfig,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn Generator>, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_backoff_ms);
    // Jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl Generator for RetryingGenerator {
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;
            let mut attempt = 0;
            loop {
                match self
                    .inner
                    .generate(system.clone(), conversation.clone())
                    .await
                {
                    Ok(text) => return Ok(text),
                    Err(e) if e.is_transient() && attempt < max_retries => {
                        let backoff = calculate_backoff(attempt, &self.retry_config);
                        warn!(
                            attempt = attempt + 1,
                            max_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "Retrying generation"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asteroid_core::error::AsteroidError;
    use asteroid_test_utils::{FailingGenerator, MockGenerator};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff_ms: 500,
            max_backoff_ms: 2_000,
        };
        let first = calculate_backoff(0, &config).as_millis();
        assert!((400..=600).contains(&first));
        let late = calculate_backoff(9, &config).as_millis();
        assert!(late <= 2_400);
        // Exponent overflow saturates instead of panicking.
        assert!(calculate_backoff(200, &config).as_millis() <= 2_400);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let inner = Arc::new(MockGenerator::scripted(vec![
            Err(AsteroidError::Generation("503".into())),
            Err(AsteroidError::GenerationTimeout { timeout_secs: 1 }),
            Ok("made it".into()),
        ]));
        let gen = RetryingGenerator::new(inner.clone(), fast_retry(2));

        let out = gen.generate("sys".into(), vec![Turn::user("hi")]).await.unwrap();
        assert_eq!(out, "made it");
        assert_eq!(inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = Arc::new(FailingGenerator::new("connection reset"));
        let gen = RetryingGenerator::new(inner.clone(), fast_retry(2));

        let err = gen.generate("sys".into(), vec![]).await.unwrap_err();
        assert!(matches!(err, AsteroidError::Generation(_)));
        assert_eq!(inner.attempts(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let inner = Arc::new(MockGenerator::scripted(vec![Err(AsteroidError::Config(
            "bad".into(),
        ))]));
        let gen = RetryingGenerator::new(inner.clone(), fast_retry(5));

        let err = gen.generate("sys".into(), vec![]).await.unwrap_err();
        assert!(matches!(err, AsteroidError::Config(_)));
        assert_eq!(inner.call_count(), 1);
    }
}
