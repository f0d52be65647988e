//! JSON-RPC 2.0 frames used by the `/rpc` shim and the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value as J;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const APPLICATION_ERROR: i32 = -32000;

#[derive(Deserialize, Serialize, Debug)]
pub struct RpcReq {
    pub jsonrpc: String,
    pub id: J,
    pub method: String,
    #[serde(default)]
    pub params: J,
}

impl RpcReq {
    pub fn new(id: J, method: impl Into<String>, params: J) -> Self {
        Self { jsonrpc: "2.0".into(), id, method: method.into(), params }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResp {
    pub jsonrpc: String,
    pub id: J,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<J>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErr>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcErr {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<J>,
}

pub fn ok(id: J, result: J) -> RpcResp {
    RpcResp { jsonrpc: "2.0".into(), id, result: Some(result), error: None }
}

pub fn err(id: J, code: i32, msg: impl Into<String>, data: Option<J>) -> RpcResp {
    RpcResp {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(RpcErr { code, message: msg.into(), data }),
    }
}
