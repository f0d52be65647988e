//! MCP server integration (Streamable HTTP + stdio) for the page registry.
//!
//! - Lists whatever the registry holds at request time, so late
//!   registrations show up without a restart
//! - Routes `tools/call` through the [`Invoker`], so failures come back as
//!   `isError` results rather than protocol errors

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};

use crate::core::tool::{InvocationRequest, InvocationResult, ToolDescriptor};
use crate::tools::invoker::Invoker;
use crate::tools::registry::ToolRegistry;

#[derive(Clone)]
pub struct PageSvc {
    invoker: Invoker,
}

impl PageSvc {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { invoker: Invoker::new(registry) }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.invoker.registry()
    }

    /// Registry snapshot in MCP form.
    pub fn mcp_tools(&self) -> Vec<Tool> {
        self.registry().list().iter().map(to_mcp_tool).collect()
    }

    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let request = InvocationRequest::new(name, arguments.unwrap_or_default());
        match self.invoker.invoke(&request).await {
            InvocationResult::Success { content } => {
                CallToolResult::success(content.into_iter().map(|p| Content::text(p.payload)).collect())
            }
            InvocationResult::Failure { error } => CallToolResult::error(vec![Content::text(error.to_string())]),
        }
    }
}

fn to_mcp_tool(d: &ToolDescriptor) -> Tool {
    Tool::new(d.name.clone(), d.description.clone(), Arc::new(d.input_schema.as_map().clone()))
}

impl ServerHandler for PageSvc {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("Tools registered by the hosted page. Call tools/list before tools/call.".into()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.mcp_tools();
        tracing::debug!(count = tools.len(), "mcp tools/list");
        Ok(ListToolsResult { next_cursor: None, tools })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = %request.name, "mcp tools/call");
        Ok(self.call(&request.name, request.arguments).await)
    }
}
