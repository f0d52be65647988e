pub mod todo;

pub use todo::{Completion, Todo, TodoCounts, TodoStore};
