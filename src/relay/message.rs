//! Wire messages exchanged between page, relay and orchestrator.
//!
//! Every message is `{"type": "...", "data": {...}}` with camelCase fields.

use serde::{Deserialize, Serialize};

use crate::core::tool::{Arguments, ToolDescriptor};

pub type TabId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RelayMessage {
    ToolsDiscovered { tab_id: TabId, tools: Vec<ToolDescriptor> },
    GetTabTools { tab_id: TabId },
    RequestTools { tab_id: TabId },
    ExecuteTool {
        tab_id: TabId,
        tool_name: String,
        #[serde(default)]
        parameters: Arguments,
    },
    TabClosed { tab_id: TabId },
}

impl RelayMessage {
    pub fn tab_id(&self) -> TabId {
        match self {
            RelayMessage::ToolsDiscovered { tab_id, .. }
            | RelayMessage::GetTabTools { tab_id }
            | RelayMessage::RequestTools { tab_id }
            | RelayMessage::ExecuteTool { tab_id, .. }
            | RelayMessage::TabClosed { tab_id } => *tab_id,
        }
    }
}

/// `{available, tools}`; `available: false` is the explicit "never announced" marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabToolsReply {
    pub available: bool,
    pub tools: Vec<ToolDescriptor>,
}

/// Page answer to `EXECUTE_TOOL`. `result` is the JSON-encoded envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteReply {
    pub fn ok(result: String) -> Self {
        Self { success: true, result: Some(result), error: None }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { success: false, result: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayReply {
    Tools(TabToolsReply),
    Execute(ExecuteReply),
    Ack { ok: bool },
}
