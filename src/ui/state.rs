//! Recorded chat for the REPL and tests

use crate::ui::Notifier;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Maximum chat entries to keep
const MAX_CHAT_ENTRIES: usize = 200;

/// One message shown to players
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub agent: String,
    pub message: String,
}

/// Bounded, thread-safe chat history
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Mutex<VecDeque<ChatEntry>>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(MAX_CHAT_ENTRIES)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ChatEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Messages attributed to one agent, oldest first
    pub fn messages_for(&self, agent: &str) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.agent == agent)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn contains(&self, agent: &str, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|e| e.agent == agent && e.message.contains(needle))
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<ChatEntry> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Notifier for ChatLog {
    fn notify(&self, agent: &str, message: &str) {
        let mut entries = self.lock();
        if entries.len() >= MAX_CHAT_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(ChatEntry {
            agent: agent.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_log_is_bounded() {
        let log = ChatLog::new();
        for i in 0..(MAX_CHAT_ENTRIES + 5) {
            log.notify("Steve", &format!("msg {}", i));
        }
        assert_eq!(log.len(), MAX_CHAT_ENTRIES);
        assert_eq!(log.entries()[0].message, "msg 5");
    }

    #[test]
    fn test_messages_for_filters_by_agent() {
        let log = ChatLog::new();
        log.notify("Steve", "Thinking...");
        log.notify("Alex", "Okay! mine iron");
        assert_eq!(log.messages_for("Steve"), vec!["Thinking...".to_string()]);
        assert!(log.contains("Alex", "mine"));
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }
}
