use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::core::content::{normalize, ContentPart, ResultEnvelope};
use crate::core::error::ToolError;
use crate::core::tool::{Arguments, InvocationRequest, InvocationResult};
use crate::infra::logging::log_metric;
use crate::tools::registry::ToolRegistry;

/// Resolves invocation requests against a registry and folds every outcome
/// into an [`InvocationResult`]. Nothing a handler does escapes as a panic.
///
/// There is no idempotency key: invoking a mutating tool twice with the same
/// arguments applies the effect twice.
#[derive(Clone)]
pub struct Invoker {
    registry: Arc<ToolRegistry>,
}

impl Invoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn invoke(&self, request: &InvocationRequest) -> InvocationResult {
        let tool = request.tool_name.as_str();
        let start = Instant::now();
        let result = match self.execute(request).await {
            Ok(content) => InvocationResult::Success { content },
            Err(error) => {
                tracing::warn!(tool, kind = error.kind(), error = %error, "tool invocation failed");
                log_metric(tool, "invoke_error_total", 1.0);
                InvocationResult::failure(error)
            }
        };
        log_metric(tool, "invoke_latency_ms", start.elapsed().as_millis() as f64);
        result
    }

    async fn execute(&self, request: &InvocationRequest) -> Result<Vec<ContentPart>, ToolError> {
        let entry = self.registry.get(&request.tool_name)?;
        entry.descriptor.input_schema.check(&request.arguments)?;

        tracing::debug!(tool = %request.tool_name, args = ?request.arguments, "executing tool");
        let handler = entry.handler.clone();
        let arguments = request.arguments.clone();
        let joined = tokio::spawn(async move { handler.call(&arguments).await }).await;

        let value = match joined {
            Ok(outcome) => outcome.map_err(|e| match e {
                ToolError::HandlerFault(_) => e,
                other => ToolError::HandlerFault(other.to_string()),
            })?,
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "tool execution was cancelled".to_string()
                };
                return Err(ToolError::HandlerFault(format!(
                    "tool \"{}\" crashed: {reason}",
                    request.tool_name
                )));
            }
        };
        Ok(normalize(value))
    }

    /// Boundary entry point: arguments arrive as a JSON-encoded string and are
    /// decoded before validation.
    pub async fn invoke_marshaled(&self, tool_name: &str, encoded_arguments: &str) -> InvocationResult {
        match decode_arguments(encoded_arguments) {
            Ok(arguments) => self.invoke(&InvocationRequest::new(tool_name, arguments)).await,
            Err(error) => {
                tracing::warn!(tool = tool_name, error = %error, "rejecting undecodable arguments");
                InvocationResult::failure(error)
            }
        }
    }

    /// Like [`Invoker::invoke_marshaled`], with the envelope encoded as well.
    pub async fn invoke_encoded(&self, tool_name: &str, encoded_arguments: &str) -> String {
        encode_result(&self.invoke_marshaled(tool_name, encoded_arguments).await)
    }
}

/// Decode the wire argument string. Blank input means "no arguments".
pub fn decode_arguments(encoded: &str) -> Result<Arguments, ToolError> {
    if encoded.trim().is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(encoded) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Arguments::new()),
        Ok(other) => Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
    }
}

pub fn envelope(result: &InvocationResult) -> ResultEnvelope {
    match result {
        InvocationResult::Success { content } => {
            ResultEnvelope { content: content.clone(), is_error: false }
        }
        InvocationResult::Failure { error } => {
            ResultEnvelope { content: vec![ContentPart::text(error.to_string())], is_error: true }
        }
    }
}

pub fn encode_result(result: &InvocationResult) -> String {
    serde_json::to_string(&envelope(result)).unwrap_or_else(|_| {
        r#"{"content":[{"type":"text","text":"unencodable result"}],"isError":true}"#.to_string()
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
