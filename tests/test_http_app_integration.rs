use axum::body::{to_bytes, Body};
use hyper::Request;
use serde_json::{json, Value};
use tower::ServiceExt;

use webmcp_harness::infra::boot::{Harness, PAGE_TAB};
use webmcp_harness::infra::config::Config;
use webmcp_harness::infra::http_app::build_app;

const BODY_LIMIT: usize = 1024 * 1024;

async fn post(app: &axum::Router, uri: &str, body: Value) -> Value {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert!(resp.status().is_success(), "{uri} -> {}", resp.status());
    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn rpc_and_relay_share_the_same_page_state() {
    let mut cfg = Config::default();
    cfg.agent.seed_todos = false;
    let harness = Harness::start(&cfg).unwrap();
    let app = build_app(harness.app_state());

    // add through JSON-RPC
    let v = post(
        &app,
        "/rpc",
        json!({"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"add_todo","arguments":{"text":"first"}}}),
    )
    .await;
    assert!(v["result"]["content"][0]["text"].as_str().unwrap().contains("first"));

    // add through the relay
    let v = post(
        &app,
        "/relay",
        json!({"type":"EXECUTE_TOOL","data":{"tabId":PAGE_TAB,"toolName":"add_todo","parameters":{"text":"second"}}}),
    )
    .await;
    assert_eq!(v["success"], true);

    // list through JSON-RPC with string-encoded arguments
    let v = post(
        &app,
        "/rpc",
        json!({"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"list_todos","arguments":"{}"}}),
    )
    .await;
    let text = v["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("first") && text.contains("second"), "{text}");
    assert_eq!(harness.store.len(), 2);
}

#[tokio::test]
async fn relay_reports_tools_for_hosted_tab_only() {
    let harness = Harness::start(&Config::default()).unwrap();
    let app = build_app(harness.app_state());

    let v = post(&app, "/relay", json!({"type":"REQUEST_TOOLS","data":{"tabId":PAGE_TAB}})).await;
    assert_eq!(v["available"], true);
    assert_eq!(v["tools"][0]["name"], "add_todo");

    let v = post(&app, "/relay", json!({"type":"GET_TAB_TOOLS","data":{"tabId":99}})).await;
    assert_eq!(v, json!({"available": false, "tools": []}));

    let v = post(
        &app,
        "/relay",
        json!({"type":"EXECUTE_TOOL","data":{"tabId":99,"toolName":"list_todos"}}),
    )
    .await;
    assert_eq!(v["success"], false);
    assert!(v["error"].as_str().unwrap().contains("unavailable"));
}
