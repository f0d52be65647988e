use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::core::error::ToolError;
use crate::core::tool::{ToolDescriptor, ToolHandler, ToolSpec};

/// A registered tool: its descriptor and the handler that executes it.
#[derive(Clone)]
pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry").field("descriptor", &self.descriptor).finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Inner {
    order: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

/// Page-owned tool registry. Enumeration is insertion ordered and always
/// reflects the live state; mutation is serialized by the inner lock.
pub struct ToolRegistry {
    inner: RwLock<Inner>,
    changes: watch::Sender<u64>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.list().into_iter().map(|d| d.name).collect();
        f.debug_struct("ToolRegistry").field("registered", &names).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self { inner: RwLock::new(Inner::default()), changes }
    }

    /// Add or overwrite the entry for `descriptor.name`. An overwrite keeps
    /// the tool's original position.
    pub fn register(
        &self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        if descriptor.name.trim().is_empty() {
            return Err(ToolError::InvalidDescriptor("tool name cannot be empty".into()));
        }
        descriptor.input_schema.validate()?;

        let name = descriptor.name.clone();
        {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let entry = ToolEntry { descriptor, handler };
            match inner.index.get(&name).copied() {
                Some(pos) => {
                    tracing::debug!(tool = %name, "overwriting registered tool");
                    inner.order[pos] = entry;
                }
                None => {
                    let pos = inner.order.len();
                    inner.order.push(entry);
                    inner.index.insert(name.clone(), pos);
                }
            }
        }
        self.changes.send_modify(|v| *v += 1);
        tracing::info!(tool = %name, "tool registered");
        Ok(())
    }

    /// Register a type that is both its own spec and handler.
    pub fn register_tool<T>(&self, tool: T) -> Result<(), ToolError>
    where
        T: ToolSpec + ToolHandler + 'static,
    {
        let descriptor = ToolDescriptor::from_spec(&tool)?;
        self.register(descriptor, Arc::new(tool))
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Result<ToolEntry, ToolError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .index
            .get(name)
            .map(|&pos| inner.order[pos].clone())
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change feed: the value is bumped on every successful registration.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
