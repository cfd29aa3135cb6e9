use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use asteroid_core::error::{AsteroidError, Result};
use asteroid_core::traits::Generator;
use asteroid_core::types::Turn;

type Responder = dyn Fn(&str, &[Turn]) -> Result<String> + Send + Sync;

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub conversation: Vec<Turn>,
}

/// Generator driven by a closure, recording every call it receives.
pub struct MockGenerator {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl MockGenerator {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[Turn]) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Always reply with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Reply with each scripted result in turn; errors once the script runs out.
    pub fn scripted(script: Vec<Result<String>>) -> Self {
        let script = Mutex::new(VecDeque::from(script));
        Self::new(move |_, _| {
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AsteroidError::Generation("script exhausted".into())))
        })
    }

    /// Sleep before answering, to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Generator for MockGenerator {
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = (self.responder)(&system, &conversation);
            self.calls.lock().unwrap().push(RecordedCall {
                system,
                conversation,
            });
            reply
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Generator that always fails with a transient error.
pub struct FailingGenerator {
    message: String,
    attempts: Arc<Mutex<usize>>,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: Arc::default(),
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl Generator for FailingGenerator {
    fn generate(&self, _system: String, _conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        *self.attempts.lock().unwrap() += 1;
        let message = self.message.clone();
        Box::pin(async move { Err(AsteroidError::Generation(message)) })
    }
}

/// Generator that never answers.
pub struct HangingGenerator;

impl Generator for HangingGenerator {
    fn generate(&self, _system: String, _conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        Box::pin(futures::future::pending())
    }
}
