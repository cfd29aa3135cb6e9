pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{AsteroidError, CompileError, ExecutionError, RegistryError, Result};
pub use traits::Generator;
pub use types::*;
