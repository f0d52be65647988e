use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
    System,
    ToolTrace,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::ToolTrace => "tool-trace",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
}

impl ConversationEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Append-only history. Once `window` entries are held, the oldest is evicted.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    entries: VecDeque<ConversationEntry>,
    window: usize,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl ConversationLog {
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self { entries: VecDeque::with_capacity(window), window }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        if self.entries.len() == self.window {
            self.entries.pop_front();
        }
        self.entries.push_back(ConversationEntry::new(role, content));
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    /// The last `n` user/assistant turns, oldest first. Traces and system
    /// notices are not part of the model's context.
    pub fn recent_turns(&self, n: usize) -> Vec<&ConversationEntry> {
        let mut turns: Vec<&ConversationEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| matches!(e.role, Role::User | Role::Assistant))
            .take(n)
            .collect();
        turns.reverse();
        turns
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_window() {
        let mut log = ConversationLog::with_window(3);
        for i in 0..5 {
            log.push(Role::User, format!("m{i}"));
        }
        let kept: Vec<_> = log.entries().map(|e| e.content.as_str()).collect();
        assert_eq!(kept, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn recent_turns_skip_traces() {
        let mut log = ConversationLog::default();
        log.push(Role::User, "add milk");
        log.push(Role::ToolTrace, "Calling add_todo({})");
        log.push(Role::Assistant, "Added");
        let turns = log.recent_turns(5);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "Added");
    }

    #[test]
    fn role_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Role::ToolTrace).unwrap(), "\"tool-trace\"");
        assert_eq!(Role::ToolTrace.to_string(), "tool-trace");
    }
}
