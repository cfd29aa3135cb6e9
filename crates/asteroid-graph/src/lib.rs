//! Graph execution engine: named steps connected by static edges, run as a
//! concurrent DAG over one shared, append-only state log.
//!
//! A graph is declared with `GraphBuilder` (`add_node`, `add_edge` using the
//! `START` / `END` markers), validated by `compile`, and run by `Executor`.
//! Independent branches run as separate tokio tasks; a node with several
//! incoming edges is a join and runs once, after all of its predecessors have
//! appended their entries.

pub mod builder;
pub mod executor;
pub mod registry;
pub mod state;

pub use builder::{step_fn, CompiledGraph, FnStep, GraphBuilder, Step, END, START};
pub use executor::Executor;
pub use registry::IdentityRegistry;
pub use state::StateLog;
