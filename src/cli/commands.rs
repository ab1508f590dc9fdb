//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - route: select a tool for a requirement
//! - optimize: route under the configured budget and thresholds
//! - execute: run a catalog tool with a JSON payload
//! - tools: list and inspect the catalog
//! - config: validate and print the effective configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::routing::ConstraintSet;

/// Toolgate - capability-based tool routing and execution
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra catalog files or glob patterns to load
    #[arg(long = "catalog", global = true)]
    pub catalogs: Vec<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Constraint flags shared by routing commands
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConstraintArgs {
    /// Maximum cost per call
    #[arg(long)]
    pub max_cost: Option<f64>,

    /// Minimum success rate in [0, 1]
    #[arg(long)]
    pub min_success_rate: Option<f64>,

    /// Maximum average response time in ms
    #[arg(long)]
    pub max_response_time: Option<f64>,

    /// Remaining monthly budget
    #[arg(long)]
    pub monthly_budget: Option<f64>,
}

impl ConstraintArgs {
    pub fn to_constraints(&self) -> ConstraintSet {
        ConstraintSet {
            max_cost_per_call: self.max_cost,
            min_success_rate: self.min_success_rate,
            max_response_time_ms: self.max_response_time,
            monthly_budget: self.monthly_budget,
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select the best tool for a requirement
    Route {
        /// Free-text capability requirement
        requirement: String,

        #[command(flatten)]
        constraints: ConstraintArgs,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Route with unset constraints filled from the configured budget
    Optimize {
        /// Free-text capability requirement
        requirement: String,

        #[command(flatten)]
        constraints: ConstraintArgs,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a catalog tool
    Execute {
        /// Tool ID to execute
        tool_id: String,

        /// JSON payload passed to the tool
        #[arg(default_value = "null")]
        payload: String,

        /// Timeout override in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Catalog inspection commands
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Catalog subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ToolsCommands {
    /// List catalog tools
    List {
        /// Only tools declaring this capability
        #[arg(long)]
        capability: Option<String>,

        /// Only tools of this type (local_module, http_api, mcp_component, ...)
        #[arg(short, long)]
        kind: Option<String>,

        /// Only free tools
        #[arg(long)]
        free: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one tool
    Show {
        /// Tool ID
        id: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Report every problem with the effective configuration
    Validate,

    /// Print the effective configuration as YAML
    Show,
}
