//! Drives one chat session against a tab: refresh tools, classify, prompt,
//! extract and execute.

use std::sync::Arc;

use crate::agent::conversation::{ConversationEntry, ConversationLog, Role};
use crate::agent::extract::extract_calls;
use crate::agent::intent::{IntentClassifier, KeywordClassifier};
use crate::clients::ollama::CompletionBackend;
use crate::core::content::ResultEnvelope;
use crate::core::tool::{InvocationRequest, ToolDescriptor};
use crate::relay::{ExecuteReply, Relay, TabId, TabTools};

/// Turns of context included in a conversational prompt.
const CONTEXT_TURNS: usize = 5;

pub struct Orchestrator {
    tab_id: TabId,
    relay: Arc<Relay>,
    backend: Arc<dyn CompletionBackend>,
    classifier: Box<dyn IntentClassifier>,
    log: ConversationLog,
    tools: Vec<ToolDescriptor>,
    turn: Vec<ConversationEntry>,
}

impl Orchestrator {
    pub fn new(tab_id: TabId, relay: Arc<Relay>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            tab_id,
            relay,
            backend,
            classifier: Box::new(KeywordClassifier::default()),
            log: ConversationLog::default(),
            tools: Vec::new(),
            turn: Vec::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.log = ConversationLog::with_window(window);
        self
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn history(&self) -> &ConversationLog {
        &self.log
    }

    /// Last announced tools for the tab, asking the page directly when nothing
    /// was announced. An unreachable page leaves the session with no tools.
    pub async fn refresh_tools(&mut self) -> &[ToolDescriptor] {
        self.tools = match self.relay.query_tools(self.tab_id) {
            TabTools::Available(tools) => tools,
            TabTools::Unavailable => match self.relay.request_tools(self.tab_id).await {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!(tab_id = self.tab_id, error = %e, "no tools for tab");
                    Vec::new()
                }
            },
        };
        &self.tools
    }

    /// Process one user utterance. Returns the entries appended after the
    /// user's own entry.
    pub async fn handle_utterance(&mut self, utterance: &str) -> Vec<ConversationEntry> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Vec::new();
        }
        let context = self.conversation_context();
        self.log.push(Role::User, utterance);
        self.turn.clear();

        self.refresh_tools().await;
        let names: Vec<String> = self.tools.iter().map(|t| t.name.clone()).collect();
        let attempt_tools = !self.tools.is_empty() && self.classifier.should_attempt_tool(utterance, &names);
        tracing::info!(tab_id = self.tab_id, attempt_tools, tools = names.len(), "handling utterance");

        let prompt = if attempt_tools {
            tool_calling_prompt(&self.tools, utterance)
        } else {
            conversation_prompt(&context, utterance)
        };

        let completion = match self.backend.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "completion failed");
                self.record(Role::System, format!("Backend error: {e}"));
                return std::mem::take(&mut self.turn);
            }
        };

        if attempt_tools {
            let calls = extract_calls(&completion);
            if !calls.is_empty() {
                for call in &calls {
                    self.execute(call).await;
                }
                return std::mem::take(&mut self.turn);
            }
            tracing::debug!("no tool calls in completion, answering conversationally");
        }

        self.record(Role::Assistant, completion.trim());
        std::mem::take(&mut self.turn)
    }

    async fn execute(&mut self, call: &InvocationRequest) {
        let args = serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".into());
        self.record(Role::ToolTrace, format!("Calling {}({args})", call.tool_name));

        match self.relay.forward_invocation(self.tab_id, call).await {
            Ok(reply) => match reply_text(reply) {
                Ok(text) => self.record(Role::Assistant, text),
                Err(message) => self.record(Role::System, message),
            },
            Err(e) => self.record(Role::System, format!("Page unavailable: {e}")),
        }
    }

    fn conversation_context(&self) -> Vec<ConversationEntry> {
        self.log.recent_turns(CONTEXT_TURNS).into_iter().cloned().collect()
    }

    fn record(&mut self, role: Role, content: impl Into<String>) {
        let entry = ConversationEntry::new(role, content);
        self.log.push(entry.role, entry.content.clone());
        self.turn.push(entry);
    }
}

/// Assistant-visible text of a page reply, or the failure message.
fn reply_text(reply: ExecuteReply) -> Result<String, String> {
    if !reply.success {
        let error = reply.error.unwrap_or_else(|| "unknown error".into());
        return Err(format!("Tool execution failed: {error}"));
    }
    let raw = reply.result.unwrap_or_default();
    let envelope: ResultEnvelope = serde_json::from_str(&raw)
        .map_err(|_| format!("Tool execution failed: unexpected result {raw}"))?;
    envelope
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| format!("Tool execution failed: empty result {raw}"))
}

pub fn tool_calling_prompt(tools: &[ToolDescriptor], utterance: &str) -> String {
    let tool_defs: Vec<String> = tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect();
    format!(
        r#"You are a tool calling assistant. The user wants to manage their todos.

Available tools:
{tools}

User said: "{utterance}"

Respond with ONLY JSON format, nothing else. For multiple operations, return multiple JSON objects on separate lines.

Examples:
User: "add buy milk" -> {{"tool": "add_todo", "parameters": {{"text": "buy milk"}}}}
User: "list my todos" -> {{"tool": "list_todos", "parameters": {{}}}}
User: "add task1 and task2" ->
{{"tool": "add_todo", "parameters": {{"text": "task1"}}}}
{{"tool": "add_todo", "parameters": {{"text": "task2"}}}}

Your JSON response:"#,
        tools = tool_defs.join("\n"),
    )
}

pub fn conversation_prompt(context: &[ConversationEntry], utterance: &str) -> String {
    let history: Vec<String> = context.iter().map(|e| format!("{}: {}", e.role, e.content)).collect();
    format!(
        "You are a helpful AI assistant integrated into a web browser.\n\n{}\n\nUser: {utterance}\n\nRespond naturally and helpfully.",
        history.join("\n")
    )
}
