use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::AppState;
use crate::domain::TodoStore;
use crate::infra::config::Config;
use crate::relay::{spawn_page, Relay, TabId};
use crate::tools::build_registry;
use crate::tools::invoker::Invoker;
use crate::tools::registry::ToolRegistry;

/// Tab id of the page hosted in this process.
pub const PAGE_TAB: TabId = 1;

/// The in-process page: its state, registry, and the relay it announces to.
pub struct Harness {
    pub store: Arc<TodoStore>,
    pub registry: Arc<ToolRegistry>,
    pub relay: Arc<Relay>,
    pub page: JoinHandle<()>,
}

impl Harness {
    pub fn start(cfg: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(if cfg.agent.seed_todos {
            TodoStore::with_samples()
        } else {
            TodoStore::new()
        });
        let registry = build_registry(store.clone())?;
        let relay = Arc::new(Relay::new(cfg.relay.timeout()));
        let page = spawn_page(PAGE_TAB, registry.clone(), &relay);
        tracing::info!(tab_id = PAGE_TAB, tools = registry.len(), todos = store.len(), "page started");
        Ok(Self { store, registry, relay, page })
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(Invoker::new(self.registry.clone()), self.relay.clone())
    }
}

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    tracing::info!(
        mode = %cfg.server.mode,
        port = cfg.server.port,
        backend = %cfg.backend.base_url,
        model = %cfg.backend.model,
        "BOOT webmcp-harness"
    );
    let harness = Harness::start(&cfg)?;

    // Stdio mode: run MCP over stdio ONLY (no HTTP).
    if cfg.server.mode == "stdio" {
        let svc = crate::infra::mcp::PageSvc::new(harness.registry.clone());
        crate::infra::runtime::mcp_transport::serve_stdio(svc)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let app = crate::infra::http_app::build_app(harness.app_state());
    let addr: SocketAddr = ([0, 0, 0, 0], cfg.server.port).into();
    tracing::info!(%addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
