use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known entry attribute keys.
pub mod attr {
    pub const IS_PRIOR_CONTEXT: &str = "is_prior_context";
    pub const IS_PROBLEM: &str = "is_problem";
    pub const IS_SOLUTION: &str = "is_solution";
    pub const IS_EVALUATION: &str = "is_evaluation";
    /// Node that produced the entry; stamped by the executor.
    pub const NODE_ID: &str = "node_id";
    pub const AGENT_ID: &str = "agent_id";
    pub const FOCUSED_ATTRIBUTE: &str = "focused_attribute";
    pub const AGENT_ATTRIBUTE_SCORE: &str = "agent_attribute_score";
    pub const WINNER_ID: &str = "winner_id";
    pub const EVALUATION_REASON: &str = "evaluation_reason";
}

/// One immutable record in the shared state.
///
/// Built with the consuming `with_*` methods before it is handed to the
/// state log; there is no way to mutate an entry once it has been appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    content: String,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

impl Entry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set a boolean flag such as `attr::IS_PROBLEM`.
    pub fn with_flag(self, key: &str) -> Self {
        self.with_attr(key, Value::Bool(true))
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// String attribute, `None` when absent, null, or not a string.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(|v| v.as_f64())
    }

    /// True when `key` is present and set to `true`.
    pub fn has_flag(&self, key: &str) -> bool {
        matches!(self.attributes.get(key), Some(Value::Bool(true)))
    }

    /// The node that produced this entry, if stamped.
    pub fn node_id(&self) -> Option<&str> {
        self.attr_str(attr::NODE_ID)
    }
}

/// Ordered snapshot of the entries appended during one execution.
///
/// Insertion order is significant: `find` returns the most recent match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    entries: Vec<Entry>,
}

impl State {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Most recently appended entry matching `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<&Entry>
    where
        P: Fn(&Entry) -> bool,
    {
        self.entries.iter().rev().find(|e| predicate(e))
    }

    /// All entries matching `predicate`, in log order.
    pub fn filter<P>(&self, predicate: P) -> Vec<&Entry>
    where
        P: Fn(&Entry) -> bool,
    {
        self.entries.iter().filter(|e| predicate(e)).collect()
    }

    /// Most recent entry carrying `flag`.
    pub fn find_flagged(&self, flag: &str) -> Option<&Entry> {
        self.find(|e| e.has_flag(flag))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl From<Vec<Entry>> for State {
    fn from(entries: Vec<Entry>) -> Self {
        Self::new(entries)
    }
}

/// A registered participant: static role text plus numeric attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        attributes: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }
}

/// Role in a generator conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One `(role, text)` item of the conversation passed to a `Generator`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}
