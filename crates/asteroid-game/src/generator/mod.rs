//! `Generator` implementations and decorators.

mod command;
mod retry;
mod timeout;

pub use command::CommandGenerator;
pub use retry::RetryingGenerator;
pub use timeout::TimeoutGenerator;
