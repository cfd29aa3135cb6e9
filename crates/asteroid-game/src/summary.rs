use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use asteroid_core::types::{attr, State};

/// Caller-facing view of one finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub problem: Option<String>,
    pub focused_attribute: Option<String>,
    pub solutions: Vec<SolutionSummary>,
    pub evaluation: EvaluationSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSummary {
    pub agent_id: Option<String>,
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub agent_id: Option<String>,
    pub evaluation_reason: Option<String>,
    pub focused_attribute: Option<String>,
}

impl GameSummary {
    /// Project a final state. Missing entries leave the matching fields empty.
    pub fn from_state(state: &State) -> Self {
        let problem = state.find_flagged(attr::IS_PROBLEM);
        let solutions = state
            .filter(|e| e.has_flag(attr::IS_SOLUTION))
            .into_iter()
            .map(|e| SolutionSummary {
                agent_id: e.attr_str(attr::AGENT_ID).map(str::to_string),
                solution: e.content().to_string(),
                score: e.attr_f64(attr::AGENT_ATTRIBUTE_SCORE),
            })
            .collect();
        let evaluation = state
            .find_flagged(attr::IS_EVALUATION)
            .map(|e| EvaluationSummary {
                agent_id: e.attr_str(attr::WINNER_ID).map(str::to_string),
                evaluation_reason: e.attr_str(attr::EVALUATION_REASON).map(str::to_string),
                focused_attribute: e.attr_str(attr::FOCUSED_ATTRIBUTE).map(str::to_string),
            })
            .unwrap_or_default();

        Self {
            problem: problem.map(|e| e.content().to_string()),
            focused_attribute: problem
                .and_then(|e| e.attr_str(attr::FOCUSED_ATTRIBUTE))
                .map(str::to_string),
            solutions,
            evaluation,
            created_at: Utc::now(),
        }
    }

    /// The winning solution, when the evaluator named a known agent.
    pub fn winning_solution(&self) -> Option<&SolutionSummary> {
        let winner = self.evaluation.agent_id.as_deref()?;
        self.solutions
            .iter()
            .find(|s| s.agent_id.as_deref() == Some(winner))
    }
}
