mod history;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use asteroid_core::config::AppConfig;
use asteroid_core::error::{AsteroidError, Result as AsteroidResult};
use asteroid_core::traits::Generator;
use asteroid_core::types::{Identity, Turn};
use asteroid_game::{default_roster, CommandGenerator, GameSummary, Pipeline, RetryingGenerator};
use asteroid_graph::{IdentityRegistry, START};

use history::GameHistory;

#[derive(Parser)]
#[command(
    name = "asteroid",
    version,
    about = "Astronauts crash on an asteroid and compete to survive its problems"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "asteroid.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one or more rounds
    Play {
        /// Number of rounds to play back to back
        #[arg(long, default_value = "1")]
        rounds: u32,
        /// Neither read nor record game history
        #[arg(long)]
        no_history: bool,
        /// Print each round as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Validate the config and print the game graph without playing
    Check,
    /// Show recently played games
    History {
        /// Number of games to show (defaults to game.history_limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("asteroid=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "asteroid", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    let history = GameHistory::new(config.history_path());

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Some(Commands::Check) => check(&config).await?,
        Some(Commands::History { limit }) => {
            show_history(&history, limit.unwrap_or(config.game.history_limit)).await?
        }
        Some(Commands::Play {
            rounds,
            no_history,
            json,
        }) => play(&config, &history, rounds, no_history, json).await?,
        Some(Commands::Completions { .. }) => unreachable!("handled before config load"),
        None => play(&config, &history, 1, false, false).await?,
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config");
        return Ok(AppConfig::load(path)?);
    }
    warn!(path = %path.display(), "No config file found, using defaults");
    Ok(AppConfig::default())
}

/// Identities from the config, or the built-in crew when none are declared.
fn build_registry(config: &AppConfig) -> anyhow::Result<Arc<RwLock<IdentityRegistry>>> {
    let identities: Vec<Identity> = if config.identities.is_empty() {
        default_roster()
    } else {
        config.identities.iter().cloned().map(Into::into).collect()
    };
    Ok(Arc::new(RwLock::new(IdentityRegistry::from_identities(
        identities,
    )?)))
}

fn build_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn Generator>> {
    let Some(gen_config) = &config.generator else {
        anyhow::bail!("No [generator] section configured; add one to play (see `asteroid config`)");
    };
    let command: Arc<dyn Generator> = Arc::new(CommandGenerator::from_config(gen_config));
    Ok(match &gen_config.retry {
        Some(retry) => Arc::new(RetryingGenerator::new(command, retry.clone())),
        None => command,
    })
}

/// Stand-in generator for commands that compile the graph but never run it.
struct Unconfigured;

impl Generator for Unconfigured {
    fn generate(
        &self,
        _system: String,
        _conversation: Vec<Turn>,
    ) -> BoxFuture<'_, AsteroidResult<String>> {
        Box::pin(async { Err(AsteroidError::Generation("no generator configured".into())) })
    }
}

async fn check(config: &AppConfig) -> anyhow::Result<()> {
    let registry = build_registry(config)?;
    let generator: Arc<dyn Generator> = match build_generator(config) {
        Ok(g) => g,
        Err(e) => {
            warn!(error = %e, "Generator not configured; `play` will fail");
            Arc::new(Unconfigured)
        }
    };
    let pipeline = Pipeline::new(registry.clone(), generator.clone(), &config.game)?;
    let graph = pipeline.compile().await?;

    println!("Generator: {}", generator.name());
    println!("Focus categories: {}", config.game.focus_categories.join(", "));
    println!("Node timeout: {}s", config.game.node_timeout_secs);
    println!();
    println!("Crew:");
    for identity in registry.read().await.list_all() {
        let stats: Vec<String> = identity
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("  {:<12} {}", identity.id, stats.join(" "));
    }
    println!();
    println!(
        "Graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    for node in std::iter::once(START)
        .chain(graph.topological_order().iter().map(String::as_str))
    {
        let next = graph.successors(node).join(", ");
        println!("  {node} -> {next}");
    }
    Ok(())
}

async fn play(
    config: &AppConfig,
    history: &GameHistory,
    rounds: u32,
    no_history: bool,
    json: bool,
) -> anyhow::Result<()> {
    let registry = build_registry(config)?;
    let generator = build_generator(config)?;
    let pipeline = Pipeline::new(registry, generator, &config.game)?;

    for round in 1..=rounds {
        let prior = if no_history {
            String::new()
        } else {
            history.prior_summary(config.game.history_limit).await?
        };

        info!(round, rounds, "Playing round");
        let state = match pipeline.play(&prior).await {
            Ok(state) => state,
            Err(AsteroidError::Execution(err)) => {
                error!(
                    node_id = %err.node_id,
                    phase = err.phase.as_deref().unwrap_or("-"),
                    partial_entries = err.partial.len(),
                    "Round aborted"
                );
                return Err(AsteroidError::Execution(err).into());
            }
            Err(e) => return Err(e.into()),
        };

        let summary = GameSummary::from_state(&state);
        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_round(round, &summary);
        }

        if !no_history {
            history.append(&summary).await?;
        }
    }
    Ok(())
}

fn print_round(round: u32, summary: &GameSummary) {
    println!(
        "=== Round {} (focus: {}) ===",
        round,
        summary.focused_attribute.as_deref().unwrap_or("?")
    );
    println!("\nProblem:\n{}\n", summary.problem.as_deref().unwrap_or("(none)"));
    for solution in &summary.solutions {
        let score = solution
            .score
            .map(|s| format!(" [score {s}]"))
            .unwrap_or_default();
        println!(
            "{}{}:\n  {}\n",
            solution.agent_id.as_deref().unwrap_or("?"),
            score,
            solution.solution
        );
    }
    match summary.evaluation.agent_id.as_deref() {
        Some(winner) => println!("Winner: {winner}"),
        None => println!("Winner: (evaluator reply could not be parsed)"),
    }
    if let Some(reason) = summary.evaluation.evaluation_reason.as_deref() {
        println!("Reason: {reason}");
    }
    println!();
}

async fn show_history(history: &GameHistory, limit: usize) -> anyhow::Result<()> {
    let games = history.recent(limit).await?;
    if games.is_empty() {
        println!("No games recorded in {}", history.path().display());
        return Ok(());
    }
    for game in games {
        let problem = game
            .problem
            .as_deref()
            .and_then(|p| p.lines().next())
            .unwrap_or("(no problem)");
        println!(
            "{}  {:<18} winner={:<10} {}",
            game.created_at.format("%Y-%m-%d %H:%M"),
            game.focused_attribute.as_deref().unwrap_or("?"),
            game.evaluation.agent_id.as_deref().unwrap_or("?"),
            problem
        );
    }
    Ok(())
}
