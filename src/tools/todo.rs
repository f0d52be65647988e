use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::error::ToolError;
use crate::core::tool::{Arguments, ToolHandler, ToolSpec};
use crate::domain::{Completion, TodoStore};
use crate::tools::registry::ToolRegistry;

fn str_arg<'a>(args: &'a Arguments, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::missing_field(field))
}

fn not_found(id: &str) -> ToolError {
    ToolError::handler(format!(
        "Todo with ID \"{id}\" not found. Use list_todos to see available todos and their IDs."
    ))
}

fn id_schema(purpose: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "todo_id": {
                "type": "string",
                "description": format!("The unique ID of the todo item to {purpose}. Get this from list_todos.")
            }
        },
        "required": ["todo_id"]
    })
}

#[derive(Clone)]
pub struct AddTodo {
    store: Arc<TodoStore>,
}

impl ToolSpec for AddTodo {
    fn name(&self) -> &'static str { "add_todo" }
    fn description(&self) -> &'static str {
        "Add a new item to the todo list. Use this when the user wants to create a new task or reminder."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The todo item text. Should be a clear, actionable task description."
                }
            },
            "required": ["text"]
        })
    }
}

#[async_trait]
impl ToolHandler for AddTodo {
    async fn call(&self, args: &Arguments) -> Result<Value, ToolError> {
        let text = str_arg(args, "text")?;
        if text.trim().is_empty() {
            return Err(ToolError::handler(
                "Todo text cannot be empty. Please provide a description for the todo item.",
            ));
        }
        let todo = self.store.add(text);
        tracing::info!(id = %todo.id, "agent added todo");
        Ok(json!(format!(
            "Successfully added todo: \"{}\". Todo ID: {}. Total todos: {}",
            todo.text,
            todo.id,
            self.store.len()
        )))
    }
}

#[derive(Clone)]
pub struct MarkComplete {
    store: Arc<TodoStore>,
}

impl ToolSpec for MarkComplete {
    fn name(&self) -> &'static str { "mark_complete" }
    fn description(&self) -> &'static str {
        "Mark a todo item as complete. Use this when a task has been finished. You can get the todo ID from the list_todos tool."
    }
    fn input_schema(&self) -> Value { id_schema("mark as complete") }
}

#[async_trait]
impl ToolHandler for MarkComplete {
    async fn call(&self, args: &Arguments) -> Result<Value, ToolError> {
        let id = str_arg(args, "todo_id")?;
        match self.store.complete(id) {
            Completion::Completed(todo) => Ok(json!(format!(
                "Successfully marked todo \"{}\" as complete.",
                todo.text
            ))),
            Completion::AlreadyCompleted(todo) => {
                tracing::debug!(id, "todo already complete");
                Ok(json!(format!("Todo \"{}\" is already marked as complete.", todo.text)))
            }
            Completion::NotFound => Err(not_found(id)),
        }
    }
}

#[derive(Clone)]
pub struct DeleteTodo {
    store: Arc<TodoStore>,
}

impl ToolSpec for DeleteTodo {
    fn name(&self) -> &'static str { "delete_todo" }
    fn description(&self) -> &'static str {
        "Delete a todo item from the list. Use this to remove tasks that are no longer needed. You can get the todo ID from the list_todos tool."
    }
    fn input_schema(&self) -> Value { id_schema("delete") }
}

#[async_trait]
impl ToolHandler for DeleteTodo {
    async fn call(&self, args: &Arguments) -> Result<Value, ToolError> {
        let id = str_arg(args, "todo_id")?;
        let removed = self.store.remove(id).ok_or_else(|| not_found(id))?;
        Ok(json!(format!(
            "Successfully deleted todo \"{}\". Remaining todos: {}",
            removed.text,
            self.store.len()
        )))
    }
}

#[derive(Clone)]
pub struct ListTodos {
    store: Arc<TodoStore>,
}

impl ToolSpec for ListTodos {
    fn name(&self) -> &'static str { "list_todos" }
    fn description(&self) -> &'static str {
        "Get a list of all todos with their IDs, text, and completion status. Use this to see what tasks exist before performing other operations."
    }
    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
}

#[async_trait]
impl ToolHandler for ListTodos {
    async fn call(&self, _args: &Arguments) -> Result<Value, ToolError> {
        let todos = self.store.snapshot();
        if todos.is_empty() {
            return Ok(json!("No todos found. The todo list is currently empty."));
        }
        let counts = self.store.counts();
        let lines: Vec<String> = todos
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. [{}] {}", i + 1, if t.completed { "✓" } else { " " }, t.text))
            .collect();
        let summary = json!({
            "total": counts.total,
            "completed": counts.completed,
            "pending": counts.pending,
            "todos": todos,
        });
        let structured = serde_json::to_string_pretty(&summary)
            .map_err(|e| ToolError::handler(e.to_string()))?;
        Ok(json!(format!(
            "Todo List ({} total, {} completed, {} pending):\n\n{}\n\nStructured data:\n{}",
            counts.total,
            counts.completed,
            counts.pending,
            lines.join("\n"),
            structured
        )))
    }
}

/// Register the four todo tools against `store`.
pub fn register_todo_tools(registry: &ToolRegistry, store: Arc<TodoStore>) -> Result<(), ToolError> {
    registry.register_tool(AddTodo { store: store.clone() })?;
    registry.register_tool(MarkComplete { store: store.clone() })?;
    registry.register_tool(DeleteTodo { store: store.clone() })?;
    registry.register_tool(ListTodos { store })?;
    Ok(())
}
