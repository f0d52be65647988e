pub mod mock;
pub mod ollama;

pub use mock::ScriptedBackend;
pub use ollama::{BackendError, CompletionBackend, OllamaClient};
