pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, BehaviorTuning, ExecutorConfig};
pub use error::{AgentError, Result};
