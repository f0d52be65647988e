//! Orchestrator side: conversation state, intent routing and call extraction.

pub mod conversation;
pub mod extract;
pub mod intent;
pub mod orchestrator;

pub use conversation::{ConversationEntry, ConversationLog, Role};
pub use extract::extract_calls;
pub use intent::{IntentClassifier, KeywordClassifier};
pub use orchestrator::Orchestrator;
