//! Tool records and type classification
//!
//! A ToolRecord is the canonical description of one registered tool: its
//! identity, the venue it executes in, the capabilities it declares and the
//! operational figures routing uses to rank it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::Language;
use crate::error::{Result, ToolgateError};

/// Flavour of an MCP-hosted component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpVariant {
    Service,
    Component,
    GeneralProcessor,
    TestFlow,
    Adapter,
}

impl McpVariant {
    /// Parse from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "service" | "mcp_service" => Some(Self::Service),
            "component" | "mcp_component" => Some(Self::Component),
            "general_processor" => Some(Self::GeneralProcessor),
            "test_flow" => Some(Self::TestFlow),
            "adapter" => Some(Self::Adapter),
            _ => None,
        }
    }
}

/// Tool type, carrying the data each variant needs to be executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolType {
    /// In-process handler registered with the dispatcher under `entry`
    LocalModule { entry: String },
    /// Plain HTTP API
    HttpApi { endpoint: String },
    /// Code run through the sandbox collaborator
    ShellCommand { language: Language },
    /// Cloud development tool platform
    CloudDevTool { endpoint: String },
    /// Tool published on a marketplace
    MarketplaceTool { endpoint: String },
    /// Workflow automation platform action
    AutomationTool { endpoint: String },
    /// Tool fronted by the unified smart-tool registry
    UnifiedSmartTool { endpoint: String },
    /// MCP-hosted component
    McpComponent { variant: McpVariant, endpoint: String },
}

/// Fieldless discriminant of [`ToolType`], used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    LocalModule,
    HttpApi,
    ShellCommand,
    CloudDevTool,
    MarketplaceTool,
    AutomationTool,
    UnifiedSmartTool,
    McpComponent,
}

impl ToolKind {
    /// Parse from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "local_module" | "python_module" | "local" => Some(Self::LocalModule),
            "http_api" | "http" => Some(Self::HttpApi),
            "shell_command" | "shell" => Some(Self::ShellCommand),
            "cloud_dev_tool" | "aci_dev_tool" => Some(Self::CloudDevTool),
            "marketplace_tool" | "mcp_so_tool" => Some(Self::MarketplaceTool),
            "automation_tool" | "zapier_tool" => Some(Self::AutomationTool),
            "unified_smart_tool" => Some(Self::UnifiedSmartTool),
            "mcp_component" | "mcp" => Some(Self::McpComponent),
            _ => None,
        }
    }
}

/// Where a tool's execution happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue<'a> {
    /// Invoke the named in-process handler
    InProcess(&'a str),
    /// Request/response call to an endpoint
    Remote(&'a str),
    /// Delegate to the code-execution sandbox
    Sandbox(Language),
}

impl ToolType {
    /// Discriminant without payload
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::LocalModule { .. } => ToolKind::LocalModule,
            Self::HttpApi { .. } => ToolKind::HttpApi,
            Self::ShellCommand { .. } => ToolKind::ShellCommand,
            Self::CloudDevTool { .. } => ToolKind::CloudDevTool,
            Self::MarketplaceTool { .. } => ToolKind::MarketplaceTool,
            Self::AutomationTool { .. } => ToolKind::AutomationTool,
            Self::UnifiedSmartTool { .. } => ToolKind::UnifiedSmartTool,
            Self::McpComponent { .. } => ToolKind::McpComponent,
        }
    }

    /// Execution venue for this type
    pub fn venue(&self) -> Venue<'_> {
        match self {
            Self::LocalModule { entry } => Venue::InProcess(entry),
            Self::ShellCommand { language } => Venue::Sandbox(*language),
            Self::HttpApi { endpoint }
            | Self::CloudDevTool { endpoint }
            | Self::MarketplaceTool { endpoint }
            | Self::AutomationTool { endpoint }
            | Self::UnifiedSmartTool { endpoint }
            | Self::McpComponent { endpoint, .. } => Venue::Remote(endpoint),
        }
    }

    /// Default timeout in ms when neither the tool nor the caller sets one
    pub fn default_timeout_ms(&self) -> u64 {
        match self.venue() {
            Venue::InProcess(_) => 10_000,
            Venue::Remote(_) => 30_000,
            Venue::Sandbox(_) => 30_000,
        }
    }

    fn validate(&self) -> Result<()> {
        match self.venue() {
            Venue::InProcess(entry) if entry.trim().is_empty() => Err(ToolgateError::Validation(
                "local module entry must not be empty".to_string(),
            )),
            Venue::Remote(endpoint) if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) => {
                Err(ToolgateError::Validation(format!(
                    "endpoint '{}' must be an http(s) URL",
                    endpoint
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Observed performance of a tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    /// Mean response time in milliseconds
    pub avg_response_time: f64,
    /// Fraction of calls that succeed, in [0, 1]
    pub success_rate: f64,
    /// Operations per unit time
    pub throughput: f64,
    /// Fraction in [0, 1]
    pub reliability_score: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            avg_response_time: 1000.0,
            success_rate: 0.95,
            throughput: 100.0,
            reliability_score: 0.9,
        }
    }
}

impl PerformanceMetrics {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("avg_response_time", self.avg_response_time)?;
        check_range("success_rate", self.success_rate, 1.0)?;
        check_non_negative("throughput", self.throughput)?;
        check_range("reliability_score", self.reliability_score, 1.0)
    }
}

/// Partial update of [`PerformanceMetrics`]; absent fields are left unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliability_score: Option<f64>,
}

impl MetricsUpdate {
    /// Check if any field is set
    pub fn is_empty(&self) -> bool {
        self.avg_response_time.is_none()
            && self.success_rate.is_none()
            && self.throughput.is_none()
            && self.reliability_score.is_none()
    }

    /// Merge into existing metrics, producing a new validated value
    pub fn apply(&self, base: &PerformanceMetrics) -> Result<PerformanceMetrics> {
        let merged = PerformanceMetrics {
            avg_response_time: self.avg_response_time.unwrap_or(base.avg_response_time),
            success_rate: self.success_rate.unwrap_or(base.success_rate),
            throughput: self.throughput.unwrap_or(base.throughput),
            reliability_score: self.reliability_score.unwrap_or(base.reliability_score),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Pricing class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostType {
    #[default]
    Free,
    Paid,
    Metered,
}

impl CostType {
    /// Parse from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            "metered" | "usage" => Some(Self::Metered),
            _ => None,
        }
    }
}

/// What calling a tool costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    #[serde(rename = "type")]
    pub cost_type: CostType,
    pub cost_per_call: f64,
    /// Monthly spend ceiling; `None` is unbounded
    pub monthly_limit: Option<f64>,
    pub currency: String,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::free()
    }
}

impl CostModel {
    /// A free tool
    pub fn free() -> Self {
        Self {
            cost_type: CostType::Free,
            cost_per_call: 0.0,
            monthly_limit: None,
            currency: "USD".to_string(),
        }
    }

    /// A paid tool charging a fixed amount per call
    pub fn paid(cost_per_call: f64) -> Self {
        Self {
            cost_type: CostType::Paid,
            cost_per_call,
            ..Self::free()
        }
    }

    /// A metered tool
    pub fn metered(cost_per_call: f64) -> Self {
        Self {
            cost_type: CostType::Metered,
            cost_per_call,
            ..Self::free()
        }
    }

    pub fn is_free(&self) -> bool {
        self.cost_type == CostType::Free
    }

    pub fn validate(&self) -> Result<()> {
        check_non_negative("cost_per_call", self.cost_per_call)?;
        if let Some(limit) = self.monthly_limit {
            check_non_negative("monthly_limit", limit)?;
        }
        if self.is_free() && self.cost_per_call != 0.0 {
            return Err(ToolgateError::Validation(format!(
                "free tool cannot charge {} per call",
                self.cost_per_call
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(ToolgateError::Validation("currency must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Quality signals for a tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityScores {
    /// Rating in [0, 5]
    pub user_rating: f64,
    pub documentation_quality: f64,
    pub community_support: f64,
    pub update_frequency: f64,
}

impl Default for QualityScores {
    fn default() -> Self {
        Self {
            user_rating: 4.0,
            documentation_quality: 0.8,
            community_support: 0.7,
            update_frequency: 0.8,
        }
    }
}

impl QualityScores {
    pub fn validate(&self) -> Result<()> {
        check_range("user_rating", self.user_rating, 5.0)?;
        check_range("documentation_quality", self.documentation_quality, 1.0)?;
        check_range("community_support", self.community_support, 1.0)?;
        check_range("update_frequency", self.update_frequency, 1.0)
    }
}

/// Canonical record of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Unique id; empty until assigned at registration
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Per-tool timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
    #[serde(default)]
    pub cost_model: CostModel,
    #[serde(default)]
    pub quality_scores: QualityScores,
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_platform() -> String {
    "local".to_string()
}

impl ToolRecord {
    /// Create a new record with default metrics, free cost and no capabilities
    pub fn new(name: impl Into<String>, description: impl Into<String>, tool_type: ToolType) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: description.into(),
            tool_type,
            version: default_version(),
            capabilities: BTreeSet::new(),
            platform: default_platform(),
            timeout_ms: None,
            performance_metrics: PerformanceMetrics::default(),
            cost_model: CostModel::free(),
            quality_scores: QualityScores::default(),
            registered_at: Utc::now(),
        }
    }

    /// Set a caller-chosen id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add capability tags
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_metrics(mut self, metrics: PerformanceMetrics) -> Self {
        self.performance_metrics = metrics;
        self
    }

    pub fn with_cost(mut self, cost: CostModel) -> Self {
        self.cost_model = cost;
        self
    }

    pub fn with_quality(mut self, quality: QualityScores) -> Self {
        self.quality_scores = quality;
        self
    }

    pub fn is_free(&self) -> bool {
        self.cost_model.is_free()
    }

    /// Effective cost of one call; free tools always cost zero
    pub fn effective_cost(&self) -> f64 {
        if self.is_free() { 0.0 } else { self.cost_model.cost_per_call }
    }

    /// Get effective timeout (uses type default if not specified)
    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or_else(|| self.tool_type.default_timeout_ms())
    }

    /// Trim, lowercase and deduplicate capability tags, then validate the record
    pub fn normalized(mut self) -> Result<Self> {
        let mut tags = BTreeSet::new();
        for tag in &self.capabilities {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                return Err(ToolgateError::Validation(format!(
                    "tool '{}' declares an empty capability tag",
                    self.name
                )));
            }
            tags.insert(tag);
        }
        self.capabilities = tags;
        self.validate()?;
        Ok(self)
    }

    /// Check every field against its declared range
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ToolgateError::Validation("tool name must not be empty".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(ToolgateError::Validation(format!(
                "tool '{}' has a zero timeout",
                self.name
            )));
        }
        self.tool_type.validate()?;
        self.performance_metrics.validate()?;
        self.cost_model.validate()?;
        self.quality_scores.validate()
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ToolgateError::Validation(format!(
            "{} must be a finite value >= 0, got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_range(field: &str, value: f64, max: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=max).contains(&value) {
        return Err(ToolgateError::Validation(format!(
            "{} {} outside [0, {}]",
            field, value, max
        )));
    }
    Ok(())
}
