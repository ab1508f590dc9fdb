//! Deployment environments and the settings each one implies.

use serde::{Deserialize, Serialize};

use super::global::Config;

/// Named deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    /// Parse from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "testing" | "test" => Some(Self::Testing),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }

    /// Overlay this environment's settings onto `config`.
    pub fn apply(&self, config: &mut Config) {
        match self {
            Self::Development => {
                config.logging.level = "debug".to_string();
                config.agent_core.max_concurrent_requests = 5;
                config.smart_engine.enable_cloud_tools = false;
                config.smart_engine.cost_budget.monthly_budget = 10.0;
            }
            Self::Testing => {
                config.logging.level = "warn".to_string();
                config.agent_core.max_concurrent_requests = 2;
                config.agent_core.enable_caching = false;
                config.smart_engine.enable_cloud_tools = false;
                config.adapter_mcp.enable_adapters = false;
            }
            Self::Production => {
                config.logging.level = "info".to_string();
                config.agent_core.max_concurrent_requests = 20;
                config.smart_engine.cost_budget.monthly_budget = 1000.0;
            }
        }
        config.environment = Some(*self);
    }
}
