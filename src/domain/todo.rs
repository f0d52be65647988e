use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of flipping a todo to completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Completed(Todo),
    AlreadyCompleted(Todo),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodoCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// In-memory todo list owned by one page.
#[derive(Debug, Default)]
pub struct TodoStore {
    todos: Mutex<Vec<Todo>>,
    seq: AtomicU64,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two starter items a freshly loaded demo page shows.
    pub fn with_samples() -> Self {
        let store = Self::new();
        store.add("Try the tool inspector on this page");
        store.add("Test adding a todo via AI agent");
        store
    }

    fn next_id(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("todo-{}-{n}", Utc::now().timestamp_millis())
    }

    /// Always creates a new entry; identical text yields distinct todos.
    pub fn add(&self, text: &str) -> Todo {
        let todo = Todo {
            id: self.next_id(),
            text: text.trim().to_string(),
            completed: false,
            created_at: Utc::now(),
        };
        let mut todos = self.todos.lock().unwrap_or_else(PoisonError::into_inner);
        todos.push(todo.clone());
        todo
    }

    pub fn complete(&self, id: &str) -> Completion {
        let mut todos = self.todos.lock().unwrap_or_else(PoisonError::into_inner);
        match todos.iter_mut().find(|t| t.id == id) {
            None => Completion::NotFound,
            Some(t) if t.completed => Completion::AlreadyCompleted(t.clone()),
            Some(t) => {
                t.completed = true;
                Completion::Completed(t.clone())
            }
        }
    }

    pub fn remove(&self, id: &str) -> Option<Todo> {
        let mut todos = self.todos.lock().unwrap_or_else(PoisonError::into_inner);
        let pos = todos.iter().position(|t| t.id == id)?;
        Some(todos.remove(pos))
    }

    pub fn snapshot(&self) -> Vec<Todo> {
        self.todos.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn counts(&self) -> TodoCounts {
        let todos = self.todos.lock().unwrap_or_else(PoisonError::into_inner);
        let completed = todos.iter().filter(|t| t.completed).count();
        TodoCounts { total: todos.len(), completed, pending: todos.len() - completed }
    }

    pub fn len(&self) -> usize {
        self.todos.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
