//! Shared mocks and fixtures for Asteroid tests.

pub mod fixtures;
pub mod mock_generator;

pub use fixtures::*;
pub use mock_generator::*;
