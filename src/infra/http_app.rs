use axum::{
    routing::{any_service, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::infra::mcp::PageSvc;
use crate::infra::runtime::mcp_transport::{make_streamable_http_service, LocalSessionManager};

/// `/healthz`, streamable MCP at `/mcp`, JSON-RPC at `/rpc` and the relay at `/relay`.
pub fn build_app(state: AppState) -> Router {
    let session_mgr = Arc::new(LocalSessionManager::default());
    let registry = state.invoker.registry().clone();
    let mcp_service = make_streamable_http_service(move || PageSvc::new(registry.clone()), session_mgr);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route_service("/mcp", any_service(mcp_service))
        .route("/rpc", post(crate::api::mcp::http))
        .route("/relay", post(crate::api::relay::http))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TodoStore;
    use crate::relay::Relay;
    use crate::tools::build_registry;
    use crate::tools::invoker::Invoker;
    use axum::body::{to_bytes, Body};
    use hyper::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_answers_ok() {
        let registry = build_registry(Arc::new(TodoStore::new())).unwrap();
        let app = build_app(AppState::new(Invoker::new(registry), Arc::new(Relay::default())));
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_success());
        let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
