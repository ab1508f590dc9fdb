//! Toolgate - capability-based tool routing and execution
//!
//! Toolgate keeps a catalog of heterogeneous tools (in-process modules, HTTP
//! services, sandboxed code runners, MCP adapters), picks the best one for a
//! free-text requirement under cost and performance constraints, and
//! dispatches calls to it.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod orchestrator;
pub mod registry;
pub mod routing;

pub use error::{Result, ToolgateError};
