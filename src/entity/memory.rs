use crate::core::error::Result;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Completed-action descriptions kept per agent
pub const MAX_HISTORY: usize = 50;

/// What an agent remembers across save/restore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentMemory {
    current_goal: Option<String>,
    /// Oldest first, capped at [`MAX_HISTORY`]
    history: VecDeque<String>,
    /// Tasks still queued when the memory was last synced
    pending: VecDeque<Task>,
}

impl AgentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_goal(&self) -> Option<&str> {
        self.current_goal.as_deref()
    }

    pub fn set_goal(&mut self, goal: Option<String>) {
        self.current_goal = goal.filter(|g| !g.trim().is_empty());
    }

    pub fn clear_goal(&mut self) {
        self.current_goal = None;
    }

    pub fn record_action(&mut self, description: impl Into<String>) {
        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(description.into());
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// The last `n` actions, newest last
    pub fn recent_actions(&self, n: usize) -> Vec<&str> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).map(String::as_str).collect()
    }

    pub fn set_pending<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        self.pending = tasks.into_iter().cloned().collect();
    }

    pub fn pending(&self) -> &VecDeque<Task> {
        &self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Serialize to a JSON blob
    pub fn save(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn restore(blob: &str) -> Result<Self> {
        let mut memory: Self = serde_json::from_str(blob)?;
        while memory.history.len() > MAX_HISTORY {
            memory.history.pop_front();
        }
        Ok(memory)
    }
}
