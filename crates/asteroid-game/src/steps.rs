//! Graph steps for the three game phases.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use asteroid_core::error::{AsteroidError, Result};
use asteroid_core::traits::Generator;
use asteroid_core::types::{attr, Entry, Identity, State, Turn};
use asteroid_graph::Step;

use crate::focus::FocusPicker;
use crate::prompts;
use crate::verdict::parse_verdict;

pub const PHASE_GENERATE: &str = "generate";
pub const PHASE_SOLVE: &str = "solve";
pub const PHASE_EVALUATE: &str = "evaluate";

/// Most recent problem entry together with its focus attribute.
fn problem_of(state: &State) -> Result<(&Entry, &str)> {
    let problem = state
        .find_flagged(attr::IS_PROBLEM)
        .ok_or_else(|| AsteroidError::MissingEntry(attr::IS_PROBLEM.into()))?;
    let focus = problem
        .attr_str(attr::FOCUSED_ATTRIBUTE)
        .ok_or_else(|| AsteroidError::MissingEntry(attr::FOCUSED_ATTRIBUTE.into()))?;
    Ok((problem, focus))
}

/// Phase 1: pose a problem focused on a randomly chosen attribute.
pub struct GenerateProblem {
    generator: Arc<dyn Generator>,
    focus: FocusPicker,
}

impl GenerateProblem {
    pub fn new(generator: Arc<dyn Generator>, focus: FocusPicker) -> Self {
        Self { generator, focus }
    }
}

impl Step for GenerateProblem {
    fn run(&self, state: State) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin(async move {
            let focus = self
                .focus
                .pick()
                .ok_or_else(|| AsteroidError::Config("no focus categories configured".into()))?;
            let prior = state
                .find_flagged(attr::IS_PRIOR_CONTEXT)
                .map(|e| e.content())
                .unwrap_or_default();

            info!(focus = %focus, generator = self.generator.name(), "Generating problem");
            let problem = self
                .generator
                .generate(
                    prompts::problem_system(&focus, prior),
                    vec![Turn::user(prompts::PROBLEM_REQUEST)],
                )
                .await?;

            Ok(vec![Entry::new(problem.trim())
                .with_flag(attr::IS_PROBLEM)
                .with_attr(attr::FOCUSED_ATTRIBUTE, focus)])
        })
    }

    fn phase(&self) -> Option<&str> {
        Some(PHASE_GENERATE)
    }
}

/// Phase 2: one astronaut answers the problem.
pub struct Solve {
    identity: Identity,
    generator: Arc<dyn Generator>,
}

impl Solve {
    pub fn new(identity: Identity, generator: Arc<dyn Generator>) -> Self {
        Self {
            identity,
            generator,
        }
    }
}

impl Step for Solve {
    fn run(&self, state: State) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin(async move {
            let (problem, focus) = problem_of(&state)?;
            let reply = self
                .generator
                .generate(
                    prompts::solver_system(&self.identity, focus),
                    vec![Turn::user(problem.content())],
                )
                .await?;

            let score = self.identity.attribute(focus);
            debug!(agent_id = %self.identity.id, focus, score = ?score, "Solution received");

            let mut entry = Entry::new(reply.trim())
                .with_flag(attr::IS_SOLUTION)
                .with_attr(attr::AGENT_ID, self.identity.id.as_str());
            if let Some(score) = score {
                entry = entry.with_attr(attr::AGENT_ATTRIBUTE_SCORE, score);
            }
            Ok(vec![entry])
        })
    }

    fn phase(&self) -> Option<&str> {
        Some(PHASE_SOLVE)
    }
}

/// Phase 3: judge every solution and name a winner.
pub struct Evaluate {
    generator: Arc<dyn Generator>,
}

impl Evaluate {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

impl Step for Evaluate {
    fn run(&self, state: State) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin(async move {
            let (problem, focus) = problem_of(&state)?;
            // Sibling branches finish in any order.
            let mut solutions = state.filter(|e| e.has_flag(attr::IS_SOLUTION));
            solutions.sort_by(|a, b| a.attr_str(attr::AGENT_ID).cmp(&b.attr_str(attr::AGENT_ID)));

            info!(focus, solutions = solutions.len(), "Evaluating solutions");
            let reply = self
                .generator
                .generate(
                    prompts::evaluation_system(focus),
                    vec![Turn::user(prompts::evaluation_request(
                        problem.content(),
                        focus,
                        &solutions,
                    ))],
                )
                .await?;

            let verdict = parse_verdict(&reply);
            info!(winner = ?verdict.winner_id, "Evaluation complete");

            Ok(vec![Entry::new(reply.trim())
                .with_flag(attr::IS_EVALUATION)
                .with_attr(attr::WINNER_ID, verdict.winner_value())
                .with_attr(attr::EVALUATION_REASON, verdict.reason_value())
                .with_attr(attr::FOCUSED_ATTRIBUTE, focus)])
        })
    }

    fn phase(&self) -> Option<&str> {
        Some(PHASE_EVALUATE)
    }
}
