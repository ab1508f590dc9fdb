//! Configuration sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request handling limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentCoreConfig {
    /// Concurrent executions allowed at once.
    pub max_concurrent_requests: usize,

    /// Execution timeout in seconds for tools that declare none.
    pub default_timeout: u64,

    /// Cache routing decisions.
    pub enable_caching: bool,

    /// Decision cache lifetime in seconds.
    pub cache_ttl: u64,
}

impl Default for AgentCoreConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            default_timeout: 30,
            enable_caching: true,
            cache_ttl: 300,
        }
    }
}

/// Spend limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CostBudget {
    pub max_cost_per_call: f64,
    pub monthly_budget: f64,
    pub currency: String,
}

impl Default for CostBudget {
    fn default() -> Self {
        Self {
            max_cost_per_call: 0.01,
            monthly_budget: 100.0,
            currency: "USD".to_string(),
        }
    }
}

/// Floors and ceilings applied by `optimize`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    /// Milliseconds.
    pub max_response_time: f64,
    pub min_success_rate: f64,
    pub min_reliability: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_response_time: 5000.0,
            min_success_rate: 0.95,
            min_reliability: 0.9,
        }
    }
}

/// Selection engine settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SmartEngineConfig {
    /// Route to cloud, marketplace, automation and unified smart tools.
    pub enable_cloud_tools: bool,

    /// Seconds.
    pub default_timeout: u64,

    pub cost_budget: CostBudget,

    pub performance_thresholds: PerformanceThresholds,
}

impl Default for SmartEngineConfig {
    fn default() -> Self {
        Self {
            enable_cloud_tools: true,
            default_timeout: 30,
            cost_budget: CostBudget::default(),
            performance_thresholds: PerformanceThresholds::default(),
        }
    }
}

/// Import order of adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// One MCP adapter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub enabled: bool,
    pub url: String,
    pub capabilities: Vec<String>,
    pub priority: AdapterPriority,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: String::new(),
            capabilities: Vec::new(),
            priority: AdapterPriority::Medium,
        }
    }
}

impl AdapterConfig {
    fn new(url: &str, capabilities: &[&str], priority: AdapterPriority) -> Self {
        Self {
            enabled: true,
            url: url.to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            priority,
        }
    }
}

/// MCP adapter settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterMcpConfig {
    pub enable_adapters: bool,

    /// Seconds.
    pub adapter_timeout: u64,

    pub adapters: BTreeMap<String, AdapterConfig>,
}

impl Default for AdapterMcpConfig {
    fn default() -> Self {
        let mut adapters = BTreeMap::new();
        adapters.insert(
            "advanced_analysis".to_string(),
            AdapterConfig::new(
                "http://localhost:8098",
                &["深度分析", "量化評估", "專業洞察"],
                AdapterPriority::High,
            ),
        );
        adapters.insert(
            "cloud_search".to_string(),
            AdapterConfig::new(
                "http://localhost:8096",
                &["雲端搜索", "信息檢索", "數據發現"],
                AdapterPriority::Medium,
            ),
        );
        adapters.insert(
            "github_integration".to_string(),
            AdapterConfig::new(
                "http://localhost:8095",
                &["代碼管理", "GitHub操作", "版本控制"],
                AdapterPriority::Medium,
            ),
        );
        adapters.insert(
            "smartui".to_string(),
            AdapterConfig::new(
                "http://localhost:8099",
                &["UI分析", "用戶體驗評估", "界面設計"],
                AdapterPriority::Low,
            ),
        );

        Self {
            enable_adapters: true,
            adapter_timeout: 15,
            adapters,
        }
    }
}

/// Catalog sources.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolRegistryConfig {
    /// Glob patterns of TOML catalog files.
    pub catalog_paths: Vec<String>,

    /// Registration limit.
    pub max_tools: usize,
}

impl Default for ToolRegistryConfig {
    fn default() -> Self {
        Self {
            catalog_paths: Vec::new(),
            max_tools: 100,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed level; `warning` is accepted for `warn`.
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        let level = self.level.trim().to_lowercase();
        let level = if level == "warning" { "warn".to_string() } else { level };
        level.parse().ok()
    }
}
