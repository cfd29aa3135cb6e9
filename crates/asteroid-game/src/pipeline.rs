use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use asteroid_core::config::GameConfig;
use asteroid_core::error::{AsteroidError, Result};
use asteroid_core::traits::Generator;
use asteroid_core::types::{attr, Entry, Identity, State};
use asteroid_graph::{CompiledGraph, Executor, GraphBuilder, IdentityRegistry, END, START};

use crate::focus::FocusPicker;
use crate::prompts;
use crate::steps::{Evaluate, GenerateProblem, Solve};

/// Node id of the problem generator.
pub const GENERATE_NODE: &str = "generate-problem";
/// Node id of the evaluator join.
pub const EVALUATION_NODE: &str = "evaluation";

/// The generate -> parallel solve -> evaluate game.
///
/// Solvers are read from the shared registry on every [`Pipeline::compile`],
/// so astronauts registered between rounds join the next round. A graph is
/// never reused across rounds.
pub struct Pipeline {
    registry: Arc<RwLock<IdentityRegistry>>,
    generator: Arc<dyn Generator>,
    focus: FocusPicker,
    executor: Executor,
}

impl Pipeline {
    pub fn new(
        registry: Arc<RwLock<IdentityRegistry>>,
        generator: Arc<dyn Generator>,
        config: &GameConfig,
    ) -> Result<Self> {
        if config.focus_categories.is_empty() {
            return Err(AsteroidError::Config(
                "at least one focus category is required".into(),
            ));
        }
        Ok(Self {
            registry,
            generator,
            focus: FocusPicker::random(config.focus_categories.clone()),
            executor: Executor::new()
                .with_node_timeout(Duration::from_secs(config.node_timeout_secs)),
        })
    }

    /// Replace the focus picker, e.g. to pin a round to one attribute.
    pub fn with_focus(mut self, focus: FocusPicker) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_node_timeout(timeout);
        self
    }

    pub fn registry(&self) -> &Arc<RwLock<IdentityRegistry>> {
        &self.registry
    }

    /// Build a graph from the registry as it is right now.
    pub async fn compile(&self) -> Result<CompiledGraph> {
        let identities = self.registry.read().await.list_all();
        self.build(identities)
    }

    fn build(&self, identities: Vec<Identity>) -> Result<CompiledGraph> {
        if identities.is_empty() {
            return Err(AsteroidError::NoParticipants);
        }

        let mut builder = GraphBuilder::new();
        builder
            .add_node(
                GENERATE_NODE,
                GenerateProblem::new(self.generator.clone(), self.focus.clone()),
            )
            .add_node(EVALUATION_NODE, Evaluate::new(self.generator.clone()))
            .add_edge(START, GENERATE_NODE)
            .add_edge(EVALUATION_NODE, END);

        for identity in identities {
            let id = identity.id.clone();
            builder
                .add_node(id.as_str(), Solve::new(identity, self.generator.clone()))
                .add_edge(GENERATE_NODE, id.as_str())
                .add_edge(id, EVALUATION_NODE);
        }

        Ok(builder.compile()?)
    }

    /// Play one round. `prior_summary` lists earlier problems so the
    /// generator can avoid repeating them.
    pub async fn play(&self, prior_summary: &str) -> Result<State> {
        let graph = self.compile().await?;
        info!(
            solvers = graph.successors(GENERATE_NODE).len(),
            "Starting game round"
        );

        let seed = Entry::new(prompts::prior_context(prior_summary))
            .with_flag(attr::IS_PRIOR_CONTEXT);
        let state = self
            .executor
            .execute(&graph, vec![seed])
            .await
            .map_err(Box::new)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asteroid_core::error::CompileError;
    use asteroid_core::types::Turn;
    use asteroid_test_utils::{
        identity, sample_identities, FailingGenerator, HangingGenerator, MockGenerator,
    };

    fn game_reply(_system: &str, conversation: &[Turn]) -> Result<String> {
        let text = conversation.first().map(|t| t.text.as_str()).unwrap_or("");
        if text == prompts::PROBLEM_REQUEST {
            Ok("A boulder blocks the airlock.".into())
        } else if text.contains("Solutions:") {
            Ok("The winning agent is : agent-1\nevaluation reason is : raw strength".into())
        } else {
            Ok("Move it.".into())
        }
    }

    fn registry_with(identities: Vec<Identity>) -> Arc<RwLock<IdentityRegistry>> {
        Arc::new(RwLock::new(
            IdentityRegistry::from_identities(identities).unwrap(),
        ))
    }

    fn pipeline(registry: Arc<RwLock<IdentityRegistry>>, gen: Arc<dyn Generator>) -> Pipeline {
        Pipeline::new(registry, gen, &GameConfig::default())
            .unwrap()
            .with_focus(FocusPicker::fixed("strength"))
    }

    #[tokio::test]
    async fn test_full_round() {
        let gen = Arc::new(MockGenerator::new(game_reply));
        let p = pipeline(registry_with(sample_identities()), gen.clone());

        let state = p.play("Fix the oxygen leak").await.unwrap();
        let entries = state.entries();
        assert_eq!(entries.len(), 6);
        assert!(entries[0].has_flag(attr::IS_PRIOR_CONTEXT));
        assert!(entries[1].has_flag(attr::IS_PROBLEM));
        assert!(entries[2..5].iter().all(|e| e.has_flag(attr::IS_SOLUTION)));
        assert!(entries[5].has_flag(attr::IS_EVALUATION));
        assert_eq!(entries[5].attr_str(attr::WINNER_ID), Some("agent-1"));
        assert_eq!(entries[5].node_id(), Some(EVALUATION_NODE));

        let mut solvers: Vec<_> = entries[2..5]
            .iter()
            .filter_map(|e| e.attr_str(attr::AGENT_ID))
            .collect();
        solvers.sort();
        assert_eq!(solvers, vec!["agent-1", "agent-2", "agent-3"]);

        // 1 problem + 3 solutions + 1 evaluation
        assert_eq!(gen.call_count(), 5);
        assert!(gen.calls()[0].system.contains("Fix the oxygen leak"));
    }

    #[tokio::test]
    async fn test_registration_between_rounds_adds_branch() {
        let registry = registry_with(sample_identities());
        let p = pipeline(registry.clone(), Arc::new(MockGenerator::new(game_reply)));

        let graph = p.compile().await.unwrap();
        assert_eq!(graph.successors(GENERATE_NODE).len(), 3);
        assert_eq!(graph.predecessors(EVALUATION_NODE).len(), 3);
        let first = p.play("").await.unwrap();

        registry
            .write()
            .await
            .register("agent-4", "Medic", Default::default())
            .unwrap();

        let graph = p.compile().await.unwrap();
        assert_eq!(graph.successors(GENERATE_NODE).len(), 4);
        let second = p.play("").await.unwrap();

        assert_eq!(first.len(), 6);
        assert_eq!(second.len(), 7);
    }

    #[tokio::test]
    async fn test_compiled_graph_unaffected_by_later_registration() {
        let registry = registry_with(sample_identities());
        let p = pipeline(registry.clone(), Arc::new(MockGenerator::new(game_reply)));
        let graph = p.compile().await.unwrap();

        registry
            .write()
            .await
            .register("agent-4", "Medic", Default::default())
            .unwrap();

        assert_eq!(graph.node_count(), 5);
        assert!(graph.step("agent-4").is_none());
    }

    #[tokio::test]
    async fn test_no_participants() {
        let p = pipeline(registry_with(vec![]), Arc::new(MockGenerator::fixed("x")));
        assert!(matches!(
            p.play("").await.unwrap_err(),
            AsteroidError::NoParticipants
        ));
    }

    #[tokio::test]
    async fn test_identity_colliding_with_phase_node() {
        let p = pipeline(
            registry_with(vec![identity(EVALUATION_NODE, "Impostor", &[])]),
            Arc::new(MockGenerator::fixed("x")),
        );
        let err = p.compile().await.unwrap_err();
        assert!(matches!(
            err,
            AsteroidError::Compile(CompileError::DuplicateNode(ref id)) if id == EVALUATION_NODE
        ));
    }

    #[tokio::test]
    async fn test_generator_failure_names_node_and_phase() {
        let p = pipeline(
            registry_with(sample_identities()),
            Arc::new(FailingGenerator::new("503 Service Unavailable")),
        );
        match p.play("").await.unwrap_err() {
            AsteroidError::Execution(err) => {
                assert_eq!(err.node_id, GENERATE_NODE);
                assert_eq!(err.phase.as_deref(), Some("generate"));
                assert_eq!(err.partial.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_hung_generator_times_out() {
        let p = pipeline(registry_with(sample_identities()), Arc::new(HangingGenerator))
            .with_node_timeout(Duration::from_millis(50));
        match p.play("").await.unwrap_err() {
            AsteroidError::Execution(err) => {
                assert_eq!(err.node_id, GENERATE_NODE);
                assert!(matches!(*err.cause, AsteroidError::NodeTimeout { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_focus_categories_rejected() {
        let config = GameConfig {
            focus_categories: vec![],
            ..GameConfig::default()
        };
        let result = Pipeline::new(
            registry_with(vec![]),
            Arc::new(MockGenerator::fixed("x")),
            &config,
        );
        assert!(matches!(result, Err(AsteroidError::Config(_))));
    }
}
