pub mod agent;
pub mod api;
pub mod cli;
pub mod clients;
pub mod core;
pub mod domain;
pub mod infra;
pub mod relay;
pub mod tools;
