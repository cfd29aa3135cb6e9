use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use asteroid_core::config::GeneratorConfig;
use asteroid_core::error::{AsteroidError, Result};
use asteroid_core::traits::Generator;
use asteroid_core::types::Turn;

#[derive(Serialize)]
struct Request<'a> {
    system: &'a str,
    conversation: &'a [Turn],
}

/// A generator backed by an external command.
///
/// Each call spawns `command args...`, writes
/// `{"system": ..., "conversation": [{"role", "text"}, ...]}` to its stdin and
/// takes trimmed stdout as the reply. A non-zero exit or empty output is a
/// `Generation` error; the child is killed if it outlives the timeout.
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn invoke(&self, input: Vec<u8>) -> Result<String> {
        let mut child = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AsteroidError::Generation(format!("failed to spawn '{}': {}", self.command, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading stdin is judged by its exit status.
            stdin.write_all(&input).await.ok();
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AsteroidError::Generation(format!(
                "'{}' exited with code {}: {}",
                self.command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        if stdout.is_empty() {
            return Err(AsteroidError::Generation(format!(
                "'{}' produced no output",
                self.command
            )));
        }
        Ok(stdout)
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, system: String, conversation: Vec<Turn>) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let input = serde_json::to_vec(&Request {
                system: &system,
                conversation: &conversation,
            })?;
            debug!(command = %self.command, bytes = input.len(), "Invoking generator command");

            match tokio::time::timeout(self.timeout, self.invoke(input)).await {
                Ok(result) => result,
                Err(_) => Err(AsteroidError::GenerationTimeout {
                    timeout_secs: self.timeout.as_secs(),
                }),
            }
        })
    }

    fn name(&self) -> &str {
        &self.command
    }
}
