//! Environment-variable overrides, applied after the config file and the
//! environment overlay.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolgateError};

use super::environment::Environment;
use super::global::Config;

pub const ENV_ENVIRONMENT: &str = "TOOLGATE_ENV";
pub const ENV_MAX_CONCURRENT: &str = "TOOLGATE_MAX_CONCURRENT";
pub const ENV_TIMEOUT: &str = "TOOLGATE_TIMEOUT";
pub const ENV_ENABLE_CLOUD: &str = "TOOLGATE_ENABLE_CLOUD";
pub const ENV_MONTHLY_BUDGET: &str = "TOOLGATE_MONTHLY_BUDGET";
pub const ENV_ENABLE_ADAPTERS: &str = "TOOLGATE_ENABLE_ADAPTERS";
pub const ENV_LOG_LEVEL: &str = "TOOLGATE_LOG_LEVEL";

/// Values read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EnvOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<usize>,

    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cloud_tools: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_adapters: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unparseable values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get(ENV_ENVIRONMENT) {
            Some(value) => Some(
                Environment::from_str(&value).ok_or_else(|| invalid(ENV_ENVIRONMENT, &value, "an environment name"))?,
            ),
            None => None,
        };

        Ok(Self {
            environment,
            max_concurrent_requests: parse(&get, ENV_MAX_CONCURRENT, "a positive integer")?,
            default_timeout: parse(&get, ENV_TIMEOUT, "a number of seconds")?,
            enable_cloud_tools: parse_bool(&get, ENV_ENABLE_CLOUD)?,
            monthly_budget: parse(&get, ENV_MONTHLY_BUDGET, "a number")?,
            enable_adapters: parse_bool(&get, ENV_ENABLE_ADAPTERS)?,
            log_level: get(ENV_LOG_LEVEL),
        })
    }

    /// Check if any overrides are set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `config`; a selected environment is overlaid first.
    pub fn apply(&self, config: &mut Config) {
        if let Some(environment) = self.environment {
            environment.apply(config);
        }
        if let Some(value) = self.max_concurrent_requests {
            config.agent_core.max_concurrent_requests = value;
        }
        if let Some(value) = self.default_timeout {
            config.agent_core.default_timeout = value;
        }
        if let Some(value) = self.enable_cloud_tools {
            config.smart_engine.enable_cloud_tools = value;
        }
        if let Some(value) = self.monthly_budget {
            config.smart_engine.cost_budget.monthly_budget = value;
        }
        if let Some(value) = self.enable_adapters {
            config.adapter_mcp.enable_adapters = value;
        }
        if let Some(ref value) = self.log_level {
            config.logging.level = value.clone();
        }
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> ToolgateError {
    ToolgateError::Configuration(format!("{}='{}' is not {}", key, value, expected))
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    expected: &str,
) -> Result<Option<T>> {
    match get(key) {
        Some(value) => value.parse().map(Some).map_err(|_| invalid(key, &value, expected)),
        None => Ok(None),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    match get(key) {
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(invalid(key, &value, "a boolean")),
        },
        None => Ok(None),
    }
}
