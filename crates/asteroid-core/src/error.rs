use thiserror::Error;

use crate::types::Entry;

#[derive(Debug, Error)]
pub enum AsteroidError {
    // Generator errors
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timeout after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    // Node errors
    #[error("Node timeout after {timeout_secs}s: {node_id}")]
    NodeTimeout { node_id: String, timeout_secs: u64 },

    #[error("Node panicked: {node_id}: {message}")]
    NodePanicked { node_id: String, message: String },

    #[error("Expected entry missing from state: {0}")]
    MissingEntry(String),

    // Pipeline errors
    #[error("No participants registered")]
    NoParticipants,

    #[error("Graph compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Execution(#[from] Box<ExecutionError>),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AsteroidError {
    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AsteroidError::Generation(_) | AsteroidError::GenerationTimeout { .. }
        )
    }
}

/// Graph definition errors raised by `GraphBuilder::compile`.
///
/// All of them are fatal: the graph definition has to be fixed before retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Edge references unknown node: {0}")]
    UnknownNodeReference(String),

    #[error("Graph contains a cycle through node: {0}")]
    CyclicGraph(String),

    #[error("Node not reachable between start and end: {0}")]
    UnreachableNode(String),

    #[error("Node added more than once: {0}")]
    DuplicateNode(String),

    #[error("Node id is reserved for graph markers: {0}")]
    ReservedNode(String),

    #[error("Edge {from} -> {to} enters START or leaves END")]
    MisplacedMarker { from: String, to: String },
}

/// Identity registry misuse. Recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("Identifier not registered: {0}")]
    UnknownIdentifier(String),
}

/// A node failed during `Executor::execute`.
///
/// `partial` holds every entry appended before the failure was observed,
/// including output of sibling branches that finished first.
#[derive(Debug, Error)]
#[error("Node '{node_id}' failed{}: {cause}", phase_suffix(.phase))]
pub struct ExecutionError {
    pub node_id: String,
    pub phase: Option<String>,
    #[source]
    pub cause: Box<AsteroidError>,
    pub partial: Vec<Entry>,
}

impl ExecutionError {
    pub fn new(node_id: impl Into<String>, cause: AsteroidError, partial: Vec<Entry>) -> Self {
        Self {
            node_id: node_id.into(),
            phase: None,
            cause: Box::new(cause),
            partial,
        }
    }

    pub fn with_phase(mut self, phase: Option<String>) -> Self {
        self.phase = phase;
        self
    }
}

fn phase_suffix(phase: &Option<String>) -> String {
    match phase {
        Some(p) => format!(" in phase {}", p),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, AsteroidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::UnknownNodeReference("ghost".into());
        assert!(err.to_string().contains("ghost"));

        let err = CompileError::MisplacedMarker {
            from: "a".into(),
            to: "__start__".into(),
        };
        assert!(err.to_string().contains("a -> __start__"));
    }

    #[test]
    fn test_execution_error_display_with_phase() {
        let err = ExecutionError::new(
            "agent-1",
            AsteroidError::Generation("boom".into()),
            vec![],
        )
        .with_phase(Some("solve".into()));
        let s = err.to_string();
        assert!(s.contains("agent-1"));
        assert!(s.contains("phase solve"));
        assert!(s.contains("boom"));
    }

    #[test]
    fn test_execution_error_display_without_phase() {
        let err = ExecutionError::new("n", AsteroidError::NoParticipants, vec![]);
        assert_eq!(err.to_string(), "Node 'n' failed: No participants registered");
    }

    #[test]
    fn test_registry_error_converts() {
        let err: AsteroidError = RegistryError::UnknownIdentifier("x".into()).into();
        assert!(matches!(
            err,
            AsteroidError::Registry(RegistryError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn test_is_transient() {
        assert!(AsteroidError::Generation("503".into()).is_transient());
        assert!(AsteroidError::GenerationTimeout { timeout_secs: 1 }.is_transient());
        assert!(!AsteroidError::NoParticipants.is_transient());
    }
}
