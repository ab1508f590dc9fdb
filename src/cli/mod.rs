//! CLI module for toolgate - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for routing, execution,
//! catalog inspection and configuration checks.

pub mod commands;

pub use commands::{Cli, Commands, ConfigCommands, ConstraintArgs, ToolsCommands};
