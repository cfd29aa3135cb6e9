use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AsteroidError, Result};
use crate::types::Identity;

/// Top-level Asteroid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    #[serde(default)]
    pub identities: Vec<IdentityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Categories a generated problem can focus on; one is picked uniformly per round.
    #[serde(default = "default_focus_categories")]
    pub focus_categories: Vec<String>,
    /// Upper bound for a single node, including its generator call.
    #[serde(default = "default_node_timeout")]
    pub node_timeout_secs: u64,
    /// JSONL file the CLI appends finished games to.
    #[serde(default = "default_history_file")]
    pub history_file: String,
    /// How many previous problems feed the prior-context summary.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            focus_categories: default_focus_categories(),
            node_timeout_secs: default_node_timeout(),
            history_file: default_history_file(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_focus_categories() -> Vec<String> {
    vec![
        "strength".to_string(),
        "intelligence".to_string(),
        "survivalInstincts".to_string(),
    ]
}
fn default_node_timeout() -> u64 { 180 }
fn default_history_file() -> String { "~/.asteroid/history.jsonl".to_string() }
fn default_history_limit() -> usize { 20 }

/// External process used as the text generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_generator_timeout() -> u64 { 120 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 2 }
fn default_initial_backoff() -> u64 { 500 }
fn default_max_backoff() -> u64 { 10_000 }

/// An identity declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
}

impl From<IdentityConfig> for Identity {
    fn from(cfg: IdentityConfig) -> Self {
        Identity::new(cfg.id, cfg.role, cfg.attributes)
    }
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| AsteroidError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parse config text, expanding `${ENV_VAR}` references first.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        let config: AppConfig =
            toml::from_str(&expanded).map_err(|e| AsteroidError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.game.focus_categories.is_empty() {
            return Err(AsteroidError::Config(
                "game.focus_categories must not be empty".into(),
            ));
        }
        if self.game.node_timeout_secs == 0 {
            return Err(AsteroidError::Config(
                "game.node_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the history file path (expand ~).
    pub fn history_path(&self) -> PathBuf {
        expand_home(&self.game.history_file)
    }
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_ASTEROID_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_ASTEROID_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_ASTEROID_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_ASTEROID_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_ASTEROID_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(
            config.game.focus_categories,
            vec!["strength", "intelligence", "survivalInstincts"]
        );
        assert_eq!(config.game.node_timeout_secs, 180);
        assert_eq!(config.game.history_limit, 20);
        assert!(config.generator.is_none());
        assert!(config.identities.is_empty());
    }

    #[test]
    fn test_generator_and_identities() {
        let toml_str = r#"
[generator]
command = "llm"
args = ["-m", "fast"]

[generator.retry]
max_retries = 5

[[identities]]
id = "agent-1"
role = "Veteran astronaut"
attributes = { strength = 10, intelligence = 4 }
"#;
        let config = AppConfig::parse(toml_str).unwrap();
        let gen = config.generator.unwrap();
        assert_eq!(gen.command, "llm");
        assert_eq!(gen.args, vec!["-m", "fast"]);
        assert_eq!(gen.timeout_secs, 120);
        let retry = gen.retry.unwrap();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_backoff_ms, 500);

        let identity: Identity = config.identities[0].clone().into();
        assert_eq!(identity.id, "agent-1");
        assert_eq!(identity.attribute("strength"), Some(10.0));
        assert_eq!(identity.attribute("survivalInstincts"), None);
    }

    #[test]
    fn test_empty_focus_categories_rejected() {
        let err = AppConfig::parse("[game]\nfocus_categories = []\n").unwrap_err();
        assert!(matches!(err, AsteroidError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::parse("[game\n").unwrap_err();
        assert!(matches!(err, AsteroidError::Config(_)));
    }

    #[test]
    fn test_expand_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_home("~/.asteroid/history.jsonl"),
            PathBuf::from("/home/tester/.asteroid/history.jsonl")
        );
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
