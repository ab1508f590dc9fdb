//! Root configuration.
//!
//! Loaded from an explicit path, ~/.config/toolgate/toolgate.yml or
//! ./toolgate.yml, falling back to built-in defaults.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dispatch::SandboxOptions;
use crate::error::ToolgateError;
use crate::routing::RoutingConfig;

use super::environment::Environment;
use super::overrides::EnvOverrides;
use super::sections::{
    AdapterMcpConfig, AgentCoreConfig, LoggingConfig, SmartEngineConfig, ToolRegistryConfig,
};

/// Sections a config file must declare.
pub const REQUIRED_SECTIONS: &[&str] = &["agent_core", "smart_engine", "adapter_mcp"];

/// Configuration for toolgate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Environment whose overlay was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    pub agent_core: AgentCoreConfig,

    pub smart_engine: SmartEngineConfig,

    pub adapter_mcp: AdapterMcpConfig,

    pub routing: RoutingConfig,

    pub tool_registry: ToolRegistryConfig,

    pub sandbox: SandboxOptions,

    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with fallback chain, then apply the environment
    /// overlay and environment-variable overrides.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. ~/.config/toolgate/toolgate.yml
    /// 3. ./toolgate.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        let overrides = EnvOverrides::from_env().context("Invalid environment override")?;
        config.finish(&overrides);
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let mut candidates = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("toolgate").join("toolgate.yml"));
        }
        candidates.push(PathBuf::from("toolgate.yml"));

        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => {
                    log::info!("Loaded config from {}", candidate.display());
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {:#}", candidate.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read and parse one config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = Self::from_yaml_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Parse YAML, requiring every section in [`REQUIRED_SECTIONS`].
    pub fn from_yaml_str(content: &str) -> crate::Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        let missing: Vec<String> = REQUIRED_SECTIONS
            .iter()
            .filter(|section| value.get(**section).is_none())
            .map(|section| section.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ToolgateError::MissingConfigSections(missing));
        }
        Ok(serde_yaml::from_value(value)?)
    }

    /// Apply the declared environment, then `overrides`.
    pub fn finish(&mut self, overrides: &EnvOverrides) {
        if overrides.environment.is_none()
            && let Some(environment) = self.environment
        {
            environment.apply(self);
        }
        overrides.apply(self);
    }

    /// Every problem with this configuration.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.agent_core.max_concurrent_requests == 0 {
            problems.push("agent_core.max_concurrent_requests must be > 0".to_string());
        }
        if self.agent_core.default_timeout == 0 {
            problems.push("agent_core.default_timeout must be > 0".to_string());
        }
        if self.agent_core.enable_caching && self.agent_core.cache_ttl == 0 {
            problems.push("agent_core.cache_ttl must be > 0 when caching is enabled".to_string());
        }

        let budget = &self.smart_engine.cost_budget;
        check_non_negative(&mut problems, "smart_engine.cost_budget.max_cost_per_call", budget.max_cost_per_call);
        check_non_negative(&mut problems, "smart_engine.cost_budget.monthly_budget", budget.monthly_budget);
        if budget.currency.trim().is_empty() {
            problems.push("smart_engine.cost_budget.currency must not be empty".to_string());
        }

        let thresholds = &self.smart_engine.performance_thresholds;
        check_non_negative(
            &mut problems,
            "smart_engine.performance_thresholds.max_response_time",
            thresholds.max_response_time,
        );
        check_fraction(
            &mut problems,
            "smart_engine.performance_thresholds.min_success_rate",
            thresholds.min_success_rate,
        );
        check_fraction(
            &mut problems,
            "smart_engine.performance_thresholds.min_reliability",
            thresholds.min_reliability,
        );

        for (name, adapter) in &self.adapter_mcp.adapters {
            if adapter.enabled && adapter.url.trim().is_empty() {
                problems.push(format!("adapter_mcp.adapters.{}.url must not be empty", name));
            }
        }

        problems.extend(self.routing.weights.problems());

        if self.tool_registry.max_tools == 0 {
            problems.push("tool_registry.max_tools must be > 0".to_string());
        }
        if self.sandbox.timeout_s == 0 {
            problems.push("sandbox.timeout_s must be > 0".to_string());
        }
        if self.logging.level_filter().is_none() {
            problems.push(format!("logging.level '{}' is not a log level", self.logging.level));
        }

        problems
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ToolgateError::Configuration(problems.join("; ")))
        }
    }
}

fn check_non_negative(problems: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        problems.push(format!("{} must be >= 0, got {}", field, value));
    }
}

fn check_fraction(problems: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        problems.push(format!("{} must be within [0, 1], got {}", field, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
agent_core:
  max_concurrent_requests: 4
smart_engine:
  cost_budget:
    monthly_budget: 25.0
adapter_mcp:
  enable_adapters: false
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent_core.max_concurrent_requests, 10);
        assert_eq!(config.agent_core.default_timeout, 30);
        assert_eq!(config.routing.max_alternatives, 3);
        assert!(config.routing.intelligent_fallback);
        assert_eq!(config.smart_engine.cost_budget.max_cost_per_call, 0.01);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.agent_core.max_concurrent_requests, 4);
        assert_eq!(config.smart_engine.cost_budget.monthly_budget, 25.0);
        assert!(!config.adapter_mcp.enable_adapters);
        // Other fields should have defaults
        assert_eq!(config.agent_core.cache_ttl, 300);
        assert_eq!(config.smart_engine.cost_budget.currency, "USD");
    }

    #[test]
    fn test_missing_sections_listed_in_order() {
        let err = Config::from_yaml_str("routing:\n  max_alternatives: 2\n").unwrap_err();
        match err {
            ToolgateError::MissingConfigSections(missing) => {
                assert_eq!(missing, vec!["agent_core", "smart_engine", "adapter_mcp"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_one_missing_section() {
        let yaml = "agent_core: {}\nadapter_mcp: {}\n";
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert_eq!(err.to_string(), "Missing required config sections: smart_engine");
    }

    #[test]
    fn test_problems_enumerated() {
        let mut config = Config::default();
        config.agent_core.max_concurrent_requests = 0;
        config.agent_core.default_timeout = 0;
        config.smart_engine.cost_budget.monthly_budget = -1.0;
        config.smart_engine.performance_thresholds.min_success_rate = 1.5;
        config.routing.weights.cost = 0.5;
        config.logging.level = "loud".to_string();
        if let Some(adapter) = config.adapter_mcp.adapters.get_mut("smartui") {
            adapter.url.clear();
        }

        let problems = config.problems();
        assert_eq!(problems.len(), 7, "{:?}", problems);
        assert!(problems.iter().any(|p| p.contains("max_concurrent_requests")));
        assert!(problems.iter().any(|p| p.contains("smartui")));
        assert!(problems.iter().any(|p| p.contains("sum")));
        assert!(matches!(config.validate(), Err(ToolgateError::Configuration(_))));
    }

    #[test]
    fn test_zero_alternatives_valid() {
        let mut config = Config::default();
        config.routing.max_alternatives = 0;
        assert!(config.problems().is_empty());
    }

    #[test]
    fn test_declared_environment_applied() {
        let yaml = format!("environment: testing\n{}", MINIMAL);
        let mut config = Config::from_yaml_str(&yaml).unwrap();
        config.finish(&EnvOverrides::default());
        assert_eq!(config.agent_core.max_concurrent_requests, 2);
        assert!(!config.agent_core.enable_caching);
    }

    #[test]
    fn test_override_environment_wins() {
        let yaml = format!("environment: testing\n{}", MINIMAL);
        let mut config = Config::from_yaml_str(&yaml).unwrap();
        let overrides = EnvOverrides {
            environment: Some(Environment::Production),
            ..Default::default()
        };
        config.finish(&overrides);
        assert_eq!(config.agent_core.max_concurrent_requests, 20);
        assert_eq!(config.environment, Some(Environment::Production));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.agent_core.max_concurrent_requests, 4);
    }

    #[test]
    fn test_load_explicit_file_missing_sections() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"agent_core: {}\n").unwrap();
        let err = Config::load_from_file(file.path()).unwrap_err();
        let inner = err.downcast_ref::<ToolgateError>().unwrap();
        assert!(matches!(inner, ToolgateError::MissingConfigSections(m) if m.len() == 2));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config, restored);
    }
}
