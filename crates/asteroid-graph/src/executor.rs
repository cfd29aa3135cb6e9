use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::task::JoinError;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use asteroid_core::error::{AsteroidError, ExecutionError, Result};
use asteroid_core::types::{attr, Entry, State};

use crate::builder::{CompiledGraph, Step, END, START};
use crate::state::StateLog;

/// A finished node task, tagged with the node it ran.
type Completion = (String, std::result::Result<Result<Vec<Entry>>, JoinError>);

/// Runs a [`CompiledGraph`] against an initial set of entries.
///
/// Every node whose predecessors have all completed is spawned as its own
/// tokio task, so a branch waiting on a slow step never holds up its siblings.
/// The first failure stops further dispatch and is returned together with
/// everything appended so far.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    node_timeout: Option<Duration>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any single node that runs longer than `timeout`.
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Execute `graph` and return the accumulated state.
    pub async fn execute(
        &self,
        graph: &CompiledGraph,
        initial: Vec<Entry>,
    ) -> std::result::Result<State, ExecutionError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("graph_run", run_id = %run_id);
        self.run(graph, initial).instrument(span).await
    }

    async fn run(
        &self,
        graph: &CompiledGraph,
        initial: Vec<Entry>,
    ) -> std::result::Result<State, ExecutionError> {
        let start = Instant::now();
        let log = StateLog::new(initial);

        let mut remaining: HashMap<&str, usize> = graph
            .topological_order()
            .iter()
            .map(String::as_str)
            .chain([END])
            .map(|id| (id, graph.predecessors(id).len()))
            .collect();
        let mut in_flight: FuturesUnordered<BoxFuture<'static, Completion>> =
            FuturesUnordered::new();

        info!(nodes = graph.node_count(), "Executing graph");

        for ready in release(graph, START, &mut remaining) {
            self.dispatch(graph, ready, &log, &mut in_flight);
        }

        let mut executed = 0usize;
        while remaining.get(END).copied().unwrap_or(0) > 0 {
            let Some((node_id, joined)) = in_flight.next().await else {
                // Unreachable for a compiled graph: END is reachable from every node.
                break;
            };
            let phase = graph
                .step(&node_id)
                .and_then(|s| s.phase())
                .map(str::to_string);

            let outcome = match joined {
                Ok(result) => result,
                Err(join_err) => Err(AsteroidError::NodePanicked {
                    node_id: node_id.clone(),
                    message: panic_message(join_err),
                }),
            };

            match outcome {
                Ok(entries) => {
                    let produced = entries.len();
                    log.append(stamp(&node_id, entries));
                    executed += 1;
                    debug!(node_id = %node_id, entries = produced, "Node complete");

                    for ready in release(graph, &node_id, &mut remaining) {
                        self.dispatch(graph, ready, &log, &mut in_flight);
                    }
                }
                Err(cause) => {
                    error!(
                        node_id = %node_id,
                        phase = phase.as_deref().unwrap_or("-"),
                        error = %cause,
                        in_flight = in_flight.len(),
                        "Node failed, aborting graph"
                    );
                    // Dropping `in_flight` detaches sibling tasks; nothing new is dispatched.
                    return Err(
                        ExecutionError::new(node_id, cause, log.snapshot().into_entries())
                            .with_phase(phase),
                    );
                }
            }
        }

        let state = log.snapshot();
        info!(
            nodes_executed = executed,
            entries = state.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Graph complete"
        );
        Ok(state)
    }

    fn dispatch(
        &self,
        graph: &CompiledGraph,
        node_id: &str,
        log: &StateLog,
        in_flight: &mut FuturesUnordered<BoxFuture<'static, Completion>>,
    ) {
        let Some(step) = graph.step(node_id).cloned() else {
            return;
        };
        let snapshot = log.snapshot();
        let timeout = self.node_timeout;
        let id = node_id.to_string();

        debug!(node_id = %id, snapshot_len = snapshot.len(), "Dispatching node");

        let task_id = id.clone();
        let handle = tokio::spawn(
            async move { run_step(step, snapshot, &task_id, timeout).await }.in_current_span(),
        );
        in_flight.push(Box::pin(async move { (id, handle.await) }));
    }
}

async fn run_step(
    step: Arc<dyn Step>,
    snapshot: State,
    node_id: &str,
    timeout: Option<Duration>,
) -> Result<Vec<Entry>> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, step.run(snapshot)).await {
            Ok(result) => result,
            Err(_) => Err(AsteroidError::NodeTimeout {
                node_id: node_id.to_string(),
                timeout_secs: limit.as_secs(),
            }),
        },
        None => step.run(snapshot).await,
    }
}

/// Mark `done` as complete and return the successors that just became runnable.
/// `END` is never returned.
fn release<'g>(
    graph: &'g CompiledGraph,
    done: &str,
    remaining: &mut HashMap<&'g str, usize>,
) -> Vec<&'g str> {
    let mut ready = Vec::new();
    for succ in graph.successors(done) {
        if let Some(count) = remaining.get_mut(succ.as_str()) {
            *count = count.saturating_sub(1);
            if *count == 0 && succ != END {
                ready.push(succ.as_str());
            }
        }
    }
    ready
}

fn stamp(node_id: &str, entries: Vec<Entry>) -> Vec<Entry> {
    entries
        .into_iter()
        .map(|e| {
            if e.attr(attr::NODE_ID).is_some() {
                e
            } else {
                e.with_attr(attr::NODE_ID, node_id)
            }
        })
        .collect()
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
