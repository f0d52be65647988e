//! Cross-boundary relay between page endpoints and the orchestrator.
//!
//! Pages and the orchestrator never share a registry: discovery results are
//! announced per tab and invocations travel as messages over a per-tab
//! channel. A tab whose page is missing, closed or too slow to answer is
//! reported as [`RelayError::Unavailable`], never as a hang.

pub mod message;
pub mod page;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::core::tool::{InvocationRequest, ToolDescriptor};
pub use message::{ExecuteReply, RelayMessage, RelayReply, TabId, TabToolsReply};
pub use page::{spawn_page, PageCommand, PendingInvocation};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("page in tab {tab_id} is unavailable: {reason}")]
    Unavailable { tab_id: TabId, reason: String },
}

impl RelayError {
    fn unavailable(tab_id: TabId, reason: impl Into<String>) -> Self {
        RelayError::Unavailable { tab_id, reason: reason.into() }
    }
}

/// Last announced tool set for a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabTools {
    Available(Vec<ToolDescriptor>),
    Unavailable,
}

impl From<TabTools> for TabToolsReply {
    fn from(t: TabTools) -> Self {
        match t {
            TabTools::Available(tools) => TabToolsReply { available: true, tools },
            TabTools::Unavailable => TabToolsReply { available: false, tools: Vec::new() },
        }
    }
}

#[derive(Default)]
struct TabState {
    tools: Option<Vec<ToolDescriptor>>,
    page: Option<mpsc::Sender<PageCommand>>,
}

pub struct Relay {
    tabs: RwLock<HashMap<TabId, TabState>>,
    timeout: Duration,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Relay {
    pub fn new(timeout: Duration) -> Self {
        Self { tabs: RwLock::new(HashMap::new()), timeout }
    }

    /// Store `tools` for `tab_id`, replacing whatever was there.
    pub fn announce_tools(&self, tab_id: TabId, tools: Vec<ToolDescriptor>) {
        tracing::info!(tab_id, count = tools.len(), "tools announced");
        let mut tabs = self.tabs.write().unwrap_or_else(PoisonError::into_inner);
        tabs.entry(tab_id).or_default().tools = Some(tools);
    }

    pub fn query_tools(&self, tab_id: TabId) -> TabTools {
        let tabs = self.tabs.read().unwrap_or_else(PoisonError::into_inner);
        match tabs.get(&tab_id).and_then(|t| t.tools.clone()) {
            Some(tools) => TabTools::Available(tools),
            None => TabTools::Unavailable,
        }
    }

    /// Attach the command channel of the page living in `tab_id`.
    pub fn connect(&self, tab_id: TabId, page: mpsc::Sender<PageCommand>) {
        tracing::debug!(tab_id, "page connected");
        let mut tabs = self.tabs.write().unwrap_or_else(PoisonError::into_inner);
        tabs.entry(tab_id).or_default().page = Some(page);
    }

    /// Forget everything about `tab_id`. Dropping the channel ends the page task.
    pub fn close_tab(&self, tab_id: TabId) {
        let removed = self
            .tabs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tab_id);
        if removed.is_some() {
            tracing::info!(tab_id, "cleaned up closed tab");
        }
    }

    pub fn is_connected(&self, tab_id: TabId) -> bool {
        let tabs = self.tabs.read().unwrap_or_else(PoisonError::into_inner);
        tabs.get(&tab_id).is_some_and(|t| t.page.as_ref().is_some_and(|p| !p.is_closed()))
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Ask the page for its current tools; the answer is also announced.
    ///
    /// The answer is only stored while the same page is still attached, so a
    /// tab closed mid-request stays closed.
    pub async fn request_tools(&self, tab_id: TabId) -> Result<Vec<ToolDescriptor>, RelayError> {
        let page = self.page_of(tab_id)?;
        let tools = self
            .round_trip(tab_id, page.clone(), |reply| PageCommand::RequestTools { reply })
            .await?;
        {
            let mut tabs = self.tabs.write().unwrap_or_else(PoisonError::into_inner);
            match tabs.get_mut(&tab_id) {
                Some(tab) if tab.page.as_ref().is_some_and(|p| p.same_channel(&page)) => {
                    tab.tools = Some(tools.clone());
                }
                _ => return Err(RelayError::unavailable(tab_id, "tab closed during discovery")),
            }
        }
        tracing::info!(tab_id, count = tools.len(), "tools announced");
        Ok(tools)
    }

    /// Send one invocation to the page in `tab_id` and wait for its result.
    pub async fn forward_invocation(
        &self,
        tab_id: TabId,
        request: &InvocationRequest,
    ) -> Result<ExecuteReply, RelayError> {
        tracing::debug!(tab_id, tool = %request.tool_name, "forwarding invocation");
        let request = request.clone();
        let page = self.page_of(tab_id)?;
        self.round_trip(tab_id, page, move |reply| PageCommand::ExecuteTool {
            request,
            reply: PendingInvocation::new(reply),
        })
        .await
    }

    fn page_of(&self, tab_id: TabId) -> Result<mpsc::Sender<PageCommand>, RelayError> {
        let tabs = self.tabs.read().unwrap_or_else(PoisonError::into_inner);
        tabs.get(&tab_id)
            .and_then(|t| t.page.clone())
            .ok_or_else(|| RelayError::unavailable(tab_id, "no page is connected"))
    }

    async fn round_trip<T>(
        &self,
        tab_id: TabId,
        page: mpsc::Sender<PageCommand>,
        command: impl FnOnce(oneshot::Sender<T>) -> PageCommand,
    ) -> Result<T, RelayError> {
        let (tx, rx) = oneshot::channel();
        let exchange = async move {
            page.send(command(tx))
                .await
                .map_err(|_| RelayError::unavailable(tab_id, "page channel is closed"))?;
            rx.await
                .map_err(|_| RelayError::unavailable(tab_id, "page dropped the request"))
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(tab_id, timeout_ms = self.timeout.as_millis() as u64, "relay timed out");
                Err(RelayError::unavailable(tab_id, "timed out waiting for the page"))
            }
        }
    }

    /// Handle one wire message, as the background context would.
    pub async fn dispatch(&self, message: RelayMessage) -> RelayReply {
        match message {
            RelayMessage::ToolsDiscovered { tab_id, tools } => {
                self.announce_tools(tab_id, tools);
                RelayReply::Ack { ok: true }
            }
            RelayMessage::GetTabTools { tab_id } => RelayReply::Tools(self.query_tools(tab_id).into()),
            RelayMessage::RequestTools { tab_id } => match self.request_tools(tab_id).await {
                Ok(tools) => RelayReply::Tools(TabTools::Available(tools).into()),
                Err(e) => {
                    tracing::warn!(error = %e, "tool request failed");
                    RelayReply::Tools(TabTools::Unavailable.into())
                }
            },
            RelayMessage::ExecuteTool { tab_id, tool_name, parameters } => {
                let request = InvocationRequest::new(tool_name, parameters);
                match self.forward_invocation(tab_id, &request).await {
                    Ok(reply) => RelayReply::Execute(reply),
                    Err(e) => RelayReply::Execute(ExecuteReply::err(e.to_string())),
                }
            }
            RelayMessage::TabClosed { tab_id } => {
                self.close_tab(tab_id);
                RelayReply::Ack { ok: true }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "d", json!({"type":"object"})).unwrap()
    }

    #[test]
    fn unannounced_tab_is_unavailable() {
        let relay = Relay::default();
        assert_eq!(relay.query_tools(1), TabTools::Unavailable);
    }

    #[test]
    fn announced_empty_list_is_still_available() {
        let relay = Relay::default();
        relay.announce_tools(1, vec![]);
        assert_eq!(relay.query_tools(1), TabTools::Available(vec![]));
    }

    #[test]
    fn last_announcement_wins() {
        let relay = Relay::default();
        relay.announce_tools(1, vec![tool("a"), tool("b")]);
        relay.announce_tools(1, vec![tool("c")]);
        assert_eq!(relay.query_tools(1), TabTools::Available(vec![tool("c")]));
    }

    #[test]
    fn tabs_are_isolated() {
        let relay = Relay::default();
        relay.announce_tools(1, vec![tool("a")]);
        assert_eq!(relay.query_tools(2), TabTools::Unavailable);
    }

    #[test]
    fn closing_a_tab_discards_its_tools() {
        let relay = Relay::default();
        relay.announce_tools(1, vec![tool("a")]);
        let (tx, _rx) = mpsc::channel(1);
        relay.connect(1, tx);
        assert!(relay.is_connected(1));
        relay.close_tab(1);
        assert_eq!(relay.query_tools(1), TabTools::Unavailable);
        assert!(!relay.is_connected(1));
        assert_eq!(relay.tab_count(), 0);
    }

    #[tokio::test]
    async fn forwarding_without_a_page_is_unavailable() {
        let relay = Relay::default();
        let err = relay
            .forward_invocation(9, &InvocationRequest::new("list_todos", Default::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Unavailable { tab_id: 9, .. }));
    }

    #[tokio::test]
    async fn unresponsive_page_times_out_as_unavailable() {
        let relay = Relay::new(Duration::from_millis(50));
        let (tx, _rx) = mpsc::channel(1);
        relay.connect(4, tx);
        let err = relay.request_tools(4).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn tab_closed_during_discovery_stays_closed() {
        let relay = std::sync::Arc::new(Relay::default());
        let (tx, mut rx) = mpsc::channel(1);
        relay.connect(7, tx);

        let pending = tokio::spawn({
            let relay = relay.clone();
            async move { relay.request_tools(7).await }
        });
        let Some(PageCommand::RequestTools { reply }) = rx.recv().await else {
            panic!("expected a discovery request");
        };
        relay.close_tab(7);
        let _ = reply.send(vec![tool("slow")]);

        assert!(matches!(pending.await.unwrap(), Err(RelayError::Unavailable { tab_id: 7, .. })));
        assert_eq!(relay.query_tools(7), TabTools::Unavailable);
        assert_eq!(relay.tab_count(), 0);
    }

    #[tokio::test]
    async fn dispatch_get_tab_tools_reports_marker() {
        let relay = Relay::default();
        let reply = relay.dispatch(RelayMessage::GetTabTools { tab_id: 5 }).await;
        assert_eq!(reply, RelayReply::Tools(TabToolsReply { available: false, tools: vec![] }));

        relay
            .dispatch(RelayMessage::ToolsDiscovered { tab_id: 5, tools: vec![tool("x")] })
            .await;
        let reply = relay.dispatch(RelayMessage::GetTabTools { tab_id: 5 }).await;
        assert_eq!(reply, RelayReply::Tools(TabToolsReply { available: true, tools: vec![tool("x")] }));
    }

    #[tokio::test]
    async fn dispatch_execute_without_page_fails_softly() {
        let relay = Relay::default();
        let reply = relay
            .dispatch(RelayMessage::ExecuteTool {
                tab_id: 1,
                tool_name: "add_todo".into(),
                parameters: Default::default(),
            })
            .await;
        match reply {
            RelayReply::Execute(r) => {
                assert!(!r.success);
                assert!(r.error.unwrap().contains("unavailable"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
