use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use asteroid_core::error::{CompileError, Result};
use asteroid_core::types::{Entry, State};

/// Reserved id of the start marker.
pub const START: &str = "__start__";
/// Reserved id of the end marker.
pub const END: &str = "__end__";

/// One executable node.
///
/// A step receives the state as of its dispatch and returns the entries it
/// wants appended. It never sees appends made by branches running alongside it.
pub trait Step: Send + Sync + 'static {
    fn run(&self, state: State) -> BoxFuture<'_, Result<Vec<Entry>>>;

    /// Label attached to errors raised by this step.
    fn phase(&self) -> Option<&str> {
        None
    }
}

/// Adapter turning an async closure into a [`Step`].
pub struct FnStep<F> {
    f: F,
    phase: Option<String>,
}

/// Wrap `f` as a step.
pub fn step_fn<F, Fut>(f: F) -> FnStep<F>
where
    F: Fn(State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Entry>>> + Send + 'static,
{
    FnStep { f, phase: None }
}

impl<F> FnStep<F> {
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }
}

impl<F, Fut> Step for FnStep<F>
where
    F: Fn(State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Entry>>> + Send + 'static,
{
    fn run(&self, state: State) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin((self.f)(state))
    }

    fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }
}

/// Collects nodes and edges, then validates them into a [`CompiledGraph`].
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<(String, Arc<dyn Step>)>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding the same id twice is reported by `compile`.
    pub fn add_node(&mut self, id: impl Into<String>, step: impl Step) -> &mut Self {
        self.nodes.push((id.into(), Arc::new(step)));
        self
    }

    /// Add a node whose step is already shared.
    pub fn add_shared_node(&mut self, id: impl Into<String>, step: Arc<dyn Step>) -> &mut Self {
        self.nodes.push((id.into(), step));
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Validate the definition and freeze it.
    ///
    /// Checks run in a fixed order so that a broken definition always reports
    /// the same error: duplicate and reserved ids, misplaced markers, unknown
    /// edge endpoints, cycles, then reachability.
    pub fn compile(&self) -> std::result::Result<CompiledGraph, CompileError> {
        let mut nodes: HashMap<String, Arc<dyn Step>> = HashMap::new();
        let mut order: Vec<String> = Vec::with_capacity(self.nodes.len());
        for (id, step) in &self.nodes {
            if id == START || id == END {
                return Err(CompileError::ReservedNode(id.clone()));
            }
            if nodes.insert(id.clone(), step.clone()).is_some() {
                return Err(CompileError::DuplicateNode(id.clone()));
            }
            order.push(id.clone());
        }

        let mut seen_edges = HashSet::new();
        let mut edges: Vec<(String, String)> = Vec::with_capacity(self.edges.len());
        for (from, to) in &self.edges {
            if to == START || from == END {
                return Err(CompileError::MisplacedMarker {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            for endpoint in [from, to] {
                if endpoint != START && endpoint != END && !nodes.contains_key(endpoint) {
                    return Err(CompileError::UnknownNodeReference(endpoint.clone()));
                }
            }
            if seen_edges.insert((from.clone(), to.clone())) {
                edges.push((from.clone(), to.clone()));
            }
        }

        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        for id in std::iter::once(START).chain(order.iter().map(String::as_str)).chain([END]) {
            successors.insert(id.to_string(), Vec::new());
            predecessors.insert(id.to_string(), Vec::new());
        }
        for (from, to) in &edges {
            if let Some(list) = successors.get_mut(from) {
                list.push(to.clone());
            }
            if let Some(list) = predecessors.get_mut(to) {
                list.push(from.clone());
            }
        }

        check_acyclic(&order, &successors)?;
        check_reachable(&order, &successors, &predecessors)?;
        let topological = topological_order(&order, &successors, &predecessors);

        Ok(CompiledGraph {
            nodes,
            successors,
            predecessors,
            topological,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn check_acyclic(
    order: &[String],
    successors: &HashMap<String, Vec<String>>,
) -> std::result::Result<(), CompileError> {
    fn visit(
        node: &str,
        successors: &HashMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
    ) -> std::result::Result<(), CompileError> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(CompileError::CyclicGraph(node.to_string())),
            None => {}
        }
        marks.insert(node.to_string(), Mark::Visiting);
        if let Some(next) = successors.get(node) {
            for succ in next {
                visit(succ, successors, marks)?;
            }
        }
        marks.insert(node.to_string(), Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for id in std::iter::once(START).chain(order.iter().map(String::as_str)) {
        visit(id, successors, &mut marks)?;
    }
    Ok(())
}

fn reach(from: &str, adjacency: &HashMap<String, Vec<String>>) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([from.to_string()]);
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node.clone()) {
            continue;
        }
        if let Some(next) = adjacency.get(&node) {
            queue.extend(next.iter().filter(|n| !seen.contains(*n)).cloned());
        }
    }
    seen
}

fn check_reachable(
    order: &[String],
    successors: &HashMap<String, Vec<String>>,
    predecessors: &HashMap<String, Vec<String>>,
) -> std::result::Result<(), CompileError> {
    let forward = reach(START, successors);
    if let Some(id) = order.iter().find(|id| !forward.contains(*id)) {
        return Err(CompileError::UnreachableNode(id.clone()));
    }
    if !forward.contains(END) {
        return Err(CompileError::UnreachableNode(END.to_string()));
    }

    let backward = reach(END, predecessors);
    if let Some(id) = order.iter().find(|id| !backward.contains(*id)) {
        return Err(CompileError::UnreachableNode(id.clone()));
    }
    Ok(())
}

// Kahn's algorithm, seeded in insertion order so the result is stable.
fn topological_order(
    order: &[String],
    successors: &HashMap<String, Vec<String>>,
    predecessors: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let mut remaining: BTreeMap<&str, usize> = predecessors
        .iter()
        .map(|(id, preds)| (id.as_str(), preds.len()))
        .collect();
    let mut queue = VecDeque::from([START.to_string()]);
    let mut sorted = Vec::with_capacity(order.len());

    while let Some(node) = queue.pop_front() {
        if node != START && node != END {
            sorted.push(node.clone());
        }
        for succ in successors.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = remaining.get_mut(succ.as_str()) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(succ.clone());
                }
            }
        }
    }
    sorted
}

/// A validated, immutable graph ready for [`Executor::execute`](crate::Executor::execute).
///
/// `successors` and `predecessors` carry entries for `START` and `END` as well
/// as for every node.
pub struct CompiledGraph {
    nodes: HashMap<String, Arc<dyn Step>>,
    successors: HashMap<String, Vec<String>>,
    predecessors: HashMap<String, Vec<String>>,
    topological: Vec<String>,
}

impl CompiledGraph {
    pub fn step(&self, id: &str) -> Option<&Arc<dyn Step>> {
        self.nodes.get(id)
    }

    pub fn successors(&self, id: &str) -> &[String] {
        self.successors.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn predecessors(&self, id: &str) -> &[String] {
        self.predecessors.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Node ids (markers excluded) in a dependency-respecting order.
    pub fn topological_order(&self) -> &[String] {
        &self.topological
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("nodes", &self.topological)
            .field("edges", &self.edge_count())
            .finish()
    }
}
