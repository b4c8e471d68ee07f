//! BigQuery MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI agents to
//! query BigQuery and seed sample datasets, plus the definitions of the agents
//! that use them.

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;
pub mod warehouse;

pub use config::Config;
pub use db::BigQueryDatabase;
pub use error::{BqError, BqResult};
pub use mcp::BigQueryService;
