//! Canonical result envelope: `{"content":[{"type":"text","text":"..."}]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One part of a successful tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "text")]
    pub payload: String,
}

impl ContentPart {
    pub fn text(payload: impl Into<String>) -> Self {
        Self { kind: "text".into(), payload: payload.into() }
    }
}

/// Wire form of a tool result, as handed across the page boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub content: Vec<ContentPart>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ResultEnvelope {
    /// Text of the first part, which is what a chat surface shows.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|p| p.payload.as_str())
    }
}

/// Coerce an arbitrary handler return value into a non-empty content list.
///
/// Values already shaped like an envelope pass through untouched.
pub fn normalize(value: JsonValue) -> Vec<ContentPart> {
    if let Some(parts) = as_envelope(&value) {
        return parts;
    }
    match value {
        JsonValue::String(s) => vec![ContentPart::text(s)],
        other => vec![ContentPart::text(other.to_string())],
    }
}

fn as_envelope(value: &JsonValue) -> Option<Vec<ContentPart>> {
    let content = value.get("content")?.as_array()?;
    if content.is_empty() {
        return None;
    }
    content
        .iter()
        .map(|p| serde_json::from_value::<ContentPart>(p.clone()).ok())
        .collect()
}
