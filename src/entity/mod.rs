pub mod agent;
pub mod memory;

pub use agent::{Agent, AgentMessage};
pub use memory::AgentMemory;
