//! Plain JSON-RPC 2.0 over `POST /rpc`, for clients that do not speak
//! streamable MCP.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value as J};

use crate::api::AppState;
use crate::core::error::ToolError;
use crate::core::mcp::{RpcReq, RpcResp, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::core::tool::{InvocationRequest, InvocationResult};
use crate::infra::http::json as http_json;
use crate::tools::invoker::{envelope, Invoker};

fn tools_list(invoker: &Invoker) -> J {
    let tools: Vec<J> = invoker.registry().list().iter().map(|d| d.to_json()).collect();
    json!({ "tools": tools })
}

/// `arguments` may be an object, a JSON-encoded string, or absent.
async fn call_tool(invoker: &Invoker, name: &str, arguments: Option<&J>) -> InvocationResult {
    match arguments {
        None | Some(J::Null) => invoker.invoke(&InvocationRequest::new(name, Default::default())).await,
        Some(J::Object(map)) => invoker.invoke(&InvocationRequest::new(name, map.clone())).await,
        Some(J::String(encoded)) => invoker.invoke_marshaled(name, encoded).await,
        Some(other) => InvocationResult::failure(ToolError::InvalidArguments(format!(
            "expected an object or a JSON string, got {other}"
        ))),
    }
}

// HTTP handler
pub async fn http(
    State(state): State<AppState>,
    body: Result<Json<RpcReq>, JsonRejection>,
) -> Json<RpcResp> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejecting malformed JSON-RPC frame");
            return http_json::parse_error(format!("parse error: {rejection}"));
        }
    };
    tracing::debug!(method = %req.method, id = ?req.id, "rpc handler invoked");
    let id = req.id.clone();
    let resp = match req.method.as_str() {
        "initialize" => http_json::ok(
            id,
            json!({
                "serverInfo": { "name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") },
                "capabilities": { "tools": {} }
            }),
        ),
        "shutdown" => http_json::ok(id, J::Null),
        "tools/list" => http_json::ok(id, tools_list(&state.invoker)),
        "tools/call" => {
            let Some(name) = req.params.get("name").and_then(|v| v.as_str()) else {
                return http_json::error(id, INVALID_PARAMS, "missing tool name");
            };
            match call_tool(&state.invoker, name, req.params.get("arguments")).await {
                InvocationResult::Failure { error: error @ ToolError::ToolNotFound(_) } => {
                    http_json::from_tool_error(id, &error)
                }
                result => http_json::ok(id, json!(envelope(&result))),
            }
        }
        _ => http_json::error(id, METHOD_NOT_FOUND, format!("unknown method: {}", req.method)),
    };
    tracing::trace!(response = ?resp.0, "rpc handler completed");
    resp
}
