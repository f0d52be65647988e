pub mod mcp;
pub mod relay;

use std::sync::Arc;

use crate::relay::Relay;
use crate::tools::invoker::Invoker;

/// Shared state for the HTTP surfaces: the hosted page's invoker and the relay
/// its tab is connected to.
#[derive(Clone)]
pub struct AppState {
    pub invoker: Invoker,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(invoker: Invoker, relay: Arc<Relay>) -> Self {
        Self { invoker, relay }
    }
}
