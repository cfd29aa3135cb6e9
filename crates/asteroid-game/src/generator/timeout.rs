use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use asteroid_core::error::{AsteroidError, Result};
use asteroid_core::traits::Generator;
use asteroid_core::types::Turn;

/// Bounds every call of the wrapped generator.
pub struct TimeoutGenerator {
    inner: Arc<dyn Generator>,
    timeout: Duration,
}

impl TimeoutGenerator {
    pub fn new(inner: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Generator for TimeoutGenerator {
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.inner.generate(system, conversation)).await
            {
                Ok(result) => result,
                Err(_) => Err(AsteroidError::GenerationTimeout {
                    timeout_secs: self.timeout.as_secs(),
                }),
            }
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
