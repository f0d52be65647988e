//! Core types & traits: the tool-calling contracts shared by page, relay and agent.

pub mod content;
pub mod error;
pub mod mcp;
pub mod tool;
