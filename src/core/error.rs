use thiserror::Error;

/// Error model shared by registration and invocation.
///
/// Every variant is recoverable: the invoker folds them into a failed
/// [`InvocationResult`](crate::core::tool::InvocationResult) and the
/// orchestrator renders them as a conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid tool descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Tool \"{0}\" not found. Use tools/list to see the tools available on this page.")]
    ToolNotFound(String),
    #[error("{reason}: {field}")]
    ValidationFailure { field: String, reason: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    HandlerFault(String),
}

impl ToolError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        ToolError::ValidationFailure {
            field: field.into(),
            reason: "missing required field".into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        ToolError::HandlerFault(message.into())
    }

    /// Short, stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidDescriptor(_) => "invalid_descriptor",
            ToolError::ToolNotFound(_) => "tool_not_found",
            ToolError::ValidationFailure { .. } => "validation_failure",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::HandlerFault(_) => "handler_fault",
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(e: anyhow::Error) -> Self {
        ToolError::HandlerFault(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_displays_missing_field() {
        let e = ToolError::missing_field("text");
        assert_eq!(e.to_string(), "missing required field: text");
        assert_eq!(e.kind(), "validation_failure");
    }

    #[test]
    fn not_found_names_the_tool() {
        let e = ToolError::ToolNotFound("nope".into());
        assert!(e.to_string().contains("\"nope\""));
        assert!(e.to_string().contains("tools/list"));
    }

    #[test]
    fn it_converts_from_anyhow() {
        let any: anyhow::Error = anyhow::anyhow!("boom");
        let err: ToolError = any.into();
        assert_eq!(err, ToolError::HandlerFault("boom".into()));
    }
}
