use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use asteroid_game::GameSummary;

/// Append-only JSONL record of finished games, one summary per line.
pub struct GameHistory {
    path: PathBuf,
}

impl GameHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, summary: &GameSummary) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let line = format!("{}\n", serde_json::to_string(summary)?);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), "Game recorded");
        Ok(())
    }

    /// Up to `limit` most recent games, newest first. Unreadable lines are skipped.
    pub async fn recent(&self, limit: usize) -> anyhow::Result<Vec<GameSummary>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut games: Vec<GameSummary> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line) {
                Ok(game) => Some(game),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping unreadable history line");
                    None
                }
            })
            .collect();
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        games.truncate(limit);
        Ok(games)
    }

    /// Problems of the most recent games, newest first, one per line.
    pub async fn prior_summary(&self, limit: usize) -> anyhow::Result<String> {
        Ok(self
            .recent(limit)
            .await?
            .into_iter()
            .filter_map(|g| g.problem)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
