use serde_json::Value;
use tracing::warn;

/// Winner and rationale pulled out of the evaluator's reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub winner_id: Option<String>,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn winner_value(&self) -> Value {
        self.winner_id.clone().map(Value::String).unwrap_or(Value::Null)
    }

    pub fn reason_value(&self) -> Value {
        self.reason.clone().map(Value::String).unwrap_or(Value::Null)
    }
}

/// Leniently parse a reply shaped like
///
/// ```text
/// The winning agent is : agent-2
/// evaluation reason is : fastest repair with the tools at hand
/// ```
///
/// The winner is the text between the first and second `:` of line one; the
/// reason is everything after the first `:` of line two. Anything missing
/// comes back as `None` instead of an error.
pub fn parse_verdict(text: &str) -> Verdict {
    // TODO: ask the evaluator for a JSON object and fall back to this only on decode failure.
    let mut lines = text.lines();
    let winner_id = lines
        .next()
        .and_then(|line| line.split(':').nth(1))
        .and_then(non_empty);
    let reason = lines
        .next()
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, rest)| non_empty(rest));

    if winner_id.is_none() || reason.is_none() {
        warn!(
            winner_found = winner_id.is_some(),
            reason_found = reason.is_some(),
            "Evaluator reply did not match the expected two-line format"
        );
    }
    Verdict { winner_id, reason }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
