pub mod invoker;
pub mod registry;
pub mod todo;

use std::sync::Arc;

use crate::core::error::ToolError;
use crate::domain::TodoStore;
use registry::ToolRegistry;

/// Build the demo page registry: the todo tools over `store`.
pub fn build_registry(store: Arc<TodoStore>) -> Result<Arc<ToolRegistry>, ToolError> {
    let registry = Arc::new(ToolRegistry::new());
    todo::register_todo_tools(&registry, store)?;
    Ok(registry)
}
