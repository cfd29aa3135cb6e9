//! Prompt text for each phase.

use asteroid_core::types::{attr, Entry, Identity};

/// Text of the seed entry that carries the prior-problem summary.
pub fn prior_context(summary: &str) -> String {
    if summary.trim().is_empty() {
        "No problems have been posed yet.".to_string()
    } else {
        format!(
            "The previous problems were:\n{}\nPose a different challenge.",
            summary
        )
    }
}

pub fn problem_system(focus: &str, prior: &str) -> String {
    format!(
        "You are the master intelligence of an asteroid where a crew of astronauts has \
         crash-landed. You create challenging but solvable problems they must overcome to survive.\n\
         Create a problem that specifically tests the astronauts' {focus}.\n\
         Keep it to four or five lines.\n\
         Reply with the problem statement only, without commentary.\n\
         Do not repeat earlier problems. {prior}\n\
         Choose a scenario that can only be solved with {focus}."
    )
}

pub const PROBLEM_REQUEST: &str = "Generate a new problem for the astronauts to solve.";

pub fn solver_system(identity: &Identity, focus: &str) -> String {
    let stats = serde_json::to_string(&identity.attributes).unwrap_or_default();
    let score = identity
        .attribute(focus)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "{role}\n\
         Your stats are {stats} in JSON.\n\
         This problem specifically requires {focus}; your {focus} stat is {score}.\n\
         Give a concise solution and explain your approach in one or two lines.\n\
         Lean on your {focus} to solve it.",
        role = identity.role,
    )
}

pub fn evaluation_system(focus: &str) -> String {
    format!(
        "You are the master evaluator. Judge the solutions the astronauts gave to the problem.\n\
         The problem tests {focus}. Weigh:\n\
         1. how well the solution uses the astronaut's {focus}\n\
         2. the astronaut's {focus} score\n\
         3. how effective the solution is\n\
         4. how practical it is to carry out\n\
         Announce the winning agent id, then explain in one or two lines why it won."
    )
}

/// The evaluator's user turn: problem, every solution, and the reply format.
///
/// `solutions` should already be in a stable order.
pub fn evaluation_request(problem: &str, focus: &str, solutions: &[&Entry]) -> String {
    let listed = solutions
        .iter()
        .map(|s| {
            let agent = s.attr_str(attr::AGENT_ID).unwrap_or("unknown");
            let score = s
                .attr_f64(attr::AGENT_ATTRIBUTE_SCORE)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "Agent {agent} ({focus} score: {score}) Solution:\n{}\n",
                s.content()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Problem:\n{problem}\n\nSolutions:\n{listed}\n\n\
         Select the best solution. Reply in exactly two lines:\n\
         The winning agent is : <agent id>\n\
         evaluation reason is : <one or two sentence reason>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use asteroid_test_utils::identity;

    #[test]
    fn test_prior_context_empty_history() {
        assert!(prior_context("  ").contains("No problems"));
        assert!(prior_context("Fix the oxygen leak").contains("Fix the oxygen leak"));
    }

    #[test]
    fn test_solver_system_mentions_score() {
        let id = identity("agent-1", "You are a pilot.", &[("strength", 9.0)]);
        let prompt = solver_system(&id, "strength");
        assert!(prompt.starts_with("You are a pilot."));
        assert!(prompt.contains("your strength stat is 9"));

        let prompt = solver_system(&id, "intelligence");
        assert!(prompt.contains("your intelligence stat is unknown"));
    }

    #[test]
    fn test_evaluation_request_lists_solutions() {
        let a = Entry::new("lift the rock")
            .with_attr(attr::AGENT_ID, "agent-1")
            .with_attr(attr::AGENT_ATTRIBUTE_SCORE, 9.0);
        let b = Entry::new("build a lever").with_attr(attr::AGENT_ID, "agent-2");
        let text = evaluation_request("A boulder blocks the hatch", "strength", &[&a, &b]);
        assert!(text.contains("Agent agent-1 (strength score: 9) Solution:\nlift the rock"));
        assert!(text.contains("Agent agent-2 (strength score: n/a)"));
        assert!(text.contains("The winning agent is :"));
    }
}
