//! The asteroid survival game built on `asteroid-graph`.
//!
//! A master generator poses a problem focused on one attribute, every
//! registered astronaut answers it in parallel, and the master picks a winner
//! once all answers are in.

pub mod focus;
pub mod generator;
pub mod pipeline;
pub mod prompts;
pub mod roster;
pub mod steps;
pub mod summary;
pub mod verdict;

pub use focus::FocusPicker;
pub use generator::{CommandGenerator, RetryingGenerator, TimeoutGenerator};
pub use pipeline::{Pipeline, EVALUATION_NODE, GENERATE_NODE};
pub use roster::default_roster;
pub use summary::{EvaluationSummary, GameSummary, SolutionSummary};
pub use verdict::{parse_verdict, Verdict};
