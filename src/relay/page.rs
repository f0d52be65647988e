//! Page endpoint: the side of the relay that owns a registry.
//!
//! A page task announces its tools when it starts and again whenever its
//! registry changes, then serves commands until its tab is closed.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::message::{ExecuteReply, TabId};
use super::Relay;
use crate::core::tool::{InvocationRequest, ToolDescriptor};
use crate::tools::invoker::{encode_result, Invoker};
use crate::tools::registry::ToolRegistry;

const COMMAND_BUFFER: usize = 32;

pub enum PageCommand {
    RequestTools { reply: oneshot::Sender<Vec<ToolDescriptor>> },
    ExecuteTool { request: InvocationRequest, reply: PendingInvocation },
}

/// Reply slot for one forwarded invocation. Consumed on use, so a result can
/// be delivered at most once.
pub struct PendingInvocation {
    reply: oneshot::Sender<ExecuteReply>,
}

impl PendingInvocation {
    pub(crate) fn new(reply: oneshot::Sender<ExecuteReply>) -> Self {
        Self { reply }
    }

    pub fn forward_result(self, result: ExecuteReply) {
        if self.reply.send(result).is_err() {
            tracing::debug!("invocation result arrived after the caller gave up");
        }
    }
}

/// Start the page for `tab_id` and connect it to `relay`.
pub fn spawn_page(tab_id: TabId, registry: Arc<ToolRegistry>, relay: &Arc<Relay>) -> JoinHandle<()> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    relay.connect(tab_id, tx);
    let relay = Arc::downgrade(relay);
    tokio::spawn(run_page(tab_id, Invoker::new(registry), relay, rx))
}

async fn run_page(
    tab_id: TabId,
    invoker: Invoker,
    relay: Weak<Relay>,
    mut commands: mpsc::Receiver<PageCommand>,
) {
    let mut changes = invoker.registry().subscribe();
    changes.borrow_and_update();
    announce(tab_id, &invoker, &relay);

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(cmd) => handle(tab_id, &invoker, cmd).await,
                None => break,
            },
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                announce(tab_id, &invoker, &relay);
            }
        }
    }
    tracing::debug!(tab_id, "page stopped");
}

fn announce(tab_id: TabId, invoker: &Invoker, relay: &Weak<Relay>) {
    // A closed tab must not be resurrected by a late announcement.
    match relay.upgrade() {
        Some(relay) if relay.is_connected(tab_id) => {
            relay.announce_tools(tab_id, invoker.registry().list());
        }
        _ => {}
    }
}

async fn handle(tab_id: TabId, invoker: &Invoker, cmd: PageCommand) {
    match cmd {
        PageCommand::RequestTools { reply } => {
            let _ = reply.send(invoker.registry().list());
        }
        PageCommand::ExecuteTool { request, reply } => {
            tracing::info!(tab_id, tool = %request.tool_name, "executing forwarded tool call");
            let encoded = serde_json::to_string(&request.arguments).unwrap_or_default();
            let result = invoker.invoke_marshaled(&request.tool_name, &encoded).await;
            let answer = if result.is_success() {
                ExecuteReply::ok(encode_result(&result))
            } else {
                ExecuteReply::err(result.message())
            };
            reply.forward_result(answer);
        }
    }
}
