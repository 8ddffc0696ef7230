//! Reasoning-service integration
//!
//! The model only turns a command into a plan. Everything it produces is
//! parsed, validated and executed by ordinary code.

pub mod client;
pub mod context;
pub mod parser;
pub mod prompt;
pub mod provider;

pub use client::LlmClient;
pub use context::PromptContext;
pub use parser::parse_response;
pub use provider::{ProviderKind, ProviderSet, ReasoningProvider};
