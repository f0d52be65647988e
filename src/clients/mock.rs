use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::ollama::{BackendError, CompletionBackend};

/// Scripted backend: answers are replayed in order and prompts are recorded.
/// An exhausted script answers with a connection error.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self { responses: Mutex::new(VecDeque::new()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for r in responses {
            backend.add_response(r);
        }
        backend
    }

    pub fn add_response(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    pub fn add_error(&self, error: BackendError) {
        self.lock_responses().push_back(Err(error));
    }

    pub fn remaining_responses(&self) -> usize {
        self.lock_responses().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, BackendError>>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Connection("no scripted response left".into())))
    }
}
