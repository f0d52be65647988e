//! Pull tool calls out of a model's free-text completion.
//!
//! The model is asked for one `{"tool": ..., "parameters": {...}}` object per
//! line, but completions routinely wrap them in prose or glue several together.
//! Each balanced-brace candidate is parsed on its own; a bad candidate is
//! dropped without affecting its neighbours.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::tool::{Arguments, InvocationRequest};

/// A JSON object allowing one level of nested braces.
static CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:[^{}]|\{[^{}]*\})*\}").expect("valid regex"));

fn is_stripped(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

/// Returns every valid call in order of appearance; empty when there are none.
pub fn extract_calls(text: &str) -> Vec<InvocationRequest> {
    let calls: Vec<InvocationRequest> = CANDIDATE
        .find_iter(text.trim())
        .filter_map(|m| parse_candidate(m.as_str()))
        .collect();
    tracing::debug!(count = calls.len(), "extracted tool calls");
    calls
}

fn parse_candidate(raw: &str) -> Option<InvocationRequest> {
    let cleaned: String = raw.chars().filter(|c| !is_stripped(*c)).collect();
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, candidate = %cleaned, "skipping unparsable candidate");
            return None;
        }
    };
    let tool = value.get("tool")?.as_str()?;
    if tool.is_empty() {
        return None;
    }
    let arguments = match value.get("parameters") {
        None | Some(Value::Null) => Arguments::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            tracing::debug!(tool, parameters = %other, "skipping call with non-object parameters");
            return None;
        }
    };
    Some(InvocationRequest::new(tool, arguments))
}
