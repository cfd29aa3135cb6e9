use std::collections::BTreeMap;
use std::path::PathBuf;

use asteroid_core::types::Identity;
use tempfile::TempDir;

/// Build an identity from `(attribute, value)` pairs.
pub fn identity(id: &str, role: &str, attributes: &[(&str, f64)]) -> Identity {
    let attributes: BTreeMap<String, f64> = attributes
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    Identity::new(id, role, attributes)
}

/// Three solvers with distinct strengths, in a fixed registration order.
pub fn sample_identities() -> Vec<Identity> {
    vec![
        identity(
            "agent-1",
            "Veteran pilot",
            &[("strength", 9.0), ("intelligence", 4.0), ("survivalInstincts", 6.0)],
        ),
        identity(
            "agent-2",
            "Mission scientist",
            &[("strength", 3.0), ("intelligence", 10.0), ("survivalInstincts", 5.0)],
        ),
        identity(
            "agent-3",
            "Field engineer",
            &[("strength", 6.0), ("intelligence", 6.0), ("survivalInstincts", 9.0)],
        ),
    ]
}

pub const SAMPLE_CONFIG: &str = r#"
[game]
focus_categories = ["strength"]
node_timeout_secs = 30
history_limit = 5

[generator]
command = "cat"
timeout_secs = 10

[generator.retry]
max_retries = 1
initial_backoff_ms = 10

[[identities]]
id = "agent-1"
role = "Veteran pilot"
attributes = { strength = 9, intelligence = 4 }

[[identities]]
id = "agent-2"
role = "Mission scientist"
attributes = { strength = 3, intelligence = 10 }
"#;

/// Write `content` to `asteroid.toml` inside a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the file is needed.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("asteroid.toml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
