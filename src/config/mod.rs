//! Configuration system for toolgate.
//!
//! Layers, later ones winning:
//! 1. Config file (explicit path, ~/.config/toolgate/toolgate.yml, ./toolgate.yml) or defaults
//! 2. Environment overlay (development, testing, production)
//! 3. TOOLGATE_* environment variables

use std::path::PathBuf;

use eyre::Result;

pub use self::environment::Environment;
pub use self::global::{Config, REQUIRED_SECTIONS};
pub use self::overrides::EnvOverrides;
pub use self::sections::{
    AdapterConfig, AdapterMcpConfig, AdapterPriority, AgentCoreConfig, CostBudget, LoggingConfig,
    PerformanceThresholds, SmartEngineConfig, ToolRegistryConfig,
};

mod environment;
mod global;
mod overrides;
mod sections;

/// Load configuration from the standard search paths.
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<Config> {
    Config::load(explicit_path)
}
