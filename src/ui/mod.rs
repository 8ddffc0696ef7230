//! Player-facing notifications
//!
//! Distinct from logging: these are the lines a player would see in chat
//! ("Thinking...", progress, completion and failure notices).

pub mod state;

pub use state::{ChatEntry, ChatLog};

/// Display a message associated with an agent
pub trait Notifier: Send + Sync {
    fn notify(&self, agent: &str, message: &str);
}

/// Prints chat lines to stdout for the interactive binary
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, agent: &str, message: &str) {
        println!("<{}> {}", agent, message);
    }
}
