use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::Turn;

/// Text generation collaborator.
///
/// Treated as an opaque, possibly slow, possibly failing remote call.
/// Retry and timeout policies are layered on as decorators.
pub trait Generator: Send + Sync + 'static {
    /// Produce a reply for `conversation` under the `system` context.
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "generator"
    }
}

impl<G: Generator + ?Sized> Generator for Arc<G> {
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        (**self).generate(system, conversation)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        (**self).generate(system, conversation)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
