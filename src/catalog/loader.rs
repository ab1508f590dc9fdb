//! Catalog loading from TOML definitions and JSON snapshots
//!
//! TOML files declare tools as `[[tool]]` tables. A malformed table is
//! skipped and logged; the rest of the file still loads.

use std::path::Path;

use serde::Deserialize;

use crate::dispatch::Language;
use crate::error::{Result, ToolgateError};
use crate::id::slugify;

use super::record::{CostModel, McpVariant, PerformanceMetrics, QualityScores, ToolKind, ToolRecord, ToolType};
use super::store::Catalog;

/// TOML representation of a tool definition
#[derive(Debug, Deserialize)]
struct TomlTool {
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: String,
    kind: String,
    endpoint: Option<String>,
    entry: Option<String>,
    language: Option<String>,
    variant: Option<String>,
    version: Option<String>,
    platform: Option<String>,
    timeout_ms: Option<u64>,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    performance: PerformanceMetrics,
    #[serde(default)]
    cost: CostModel,
    #[serde(default)]
    quality: QualityScores,
}

/// TOML file structure
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(rename = "tool", default)]
    tools: Vec<toml::Value>,
}

/// Outcome of loading a batch of tool definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Ids registered
    pub loaded: Vec<String>,
    /// (tool name or position, reason) for every skipped entry
    pub skipped: Vec<(String, String)>,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.skipped.extend(other.skipped);
    }
}

impl Catalog {
    /// Load tools from a TOML string
    pub fn load_toml(&self, content: &str) -> Result<LoadReport> {
        let file: TomlCatalog = toml::from_str(content)?;
        let mut report = LoadReport::default();

        for (index, value) in file.tools.into_iter().enumerate() {
            let label = value
                .get("name")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("tool #{}", index + 1));

            let registered = value
                .try_into::<TomlTool>()
                .map_err(ToolgateError::from)
                .and_then(convert_toml_tool)
                .and_then(|record| self.register(record));

            match registered {
                Ok(id) => report.loaded.push(id),
                Err(e) => {
                    log::warn!("Skipping tool '{}': {}", label, e);
                    report.skipped.push((label, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Load tools from a TOML file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let report = self.load_toml(&content)?;
        log::info!(
            "Loaded {} tool(s) from {} ({} skipped)",
            report.loaded.len(),
            path.display(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Load every TOML file matching a glob pattern, in path order
    pub fn load_glob(&self, pattern: &str) -> Result<LoadReport> {
        let paths = glob::glob(pattern)
            .map_err(|e| ToolgateError::Configuration(format!("Invalid catalog pattern '{}': {}", pattern, e)))?;

        let mut files: Vec<_> = paths.filter_map(|entry| entry.ok()).filter(|p| p.is_file()).collect();
        files.sort();

        let mut report = LoadReport::default();
        for file in files {
            report.merge(self.load_file(&file)?);
        }
        Ok(report)
    }

    /// Write every record to a JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let records: Vec<ToolRecord> = self.snapshot().iter().map(|t| ToolRecord::clone(t)).collect();
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(records.len())
    }

    /// Restore records from a JSON file written by [`Catalog::save_json`]
    ///
    /// Existing records with the same id are replaced.
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        let mut report = LoadReport::default();

        for (index, value) in records.into_iter().enumerate() {
            let label = value["id"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| format!("record #{}", index + 1));

            let restored = serde_json::from_value::<ToolRecord>(value)
                .map_err(ToolgateError::from)
                .and_then(|record| {
                    let id = record.id.clone();
                    self.upsert(record).map(|_| id)
                });

            match restored {
                Ok(id) => report.loaded.push(id),
                Err(e) => {
                    log::warn!("Skipping persisted tool '{}': {}", label, e);
                    report.skipped.push((label, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

/// Convert TOML tool to a ToolRecord
fn convert_toml_tool(toml_tool: TomlTool) -> Result<ToolRecord> {
    let id = match toml_tool.id.clone() {
        Some(id) => id,
        None => slugify(&toml_tool.name).ok_or_else(|| {
            ToolgateError::Validation(format!("Cannot derive an id from name '{}'", toml_tool.name))
        })?,
    };

    let kind = ToolKind::from_str(&toml_tool.kind).ok_or_else(|| {
        ToolgateError::Validation(format!("Invalid kind '{}' for tool '{}'", toml_tool.kind, toml_tool.name))
    })?;

    let endpoint = || {
        toml_tool.endpoint.clone().ok_or_else(|| {
            ToolgateError::Validation(format!("Tool '{}' of kind '{}' needs an endpoint", toml_tool.name, toml_tool.kind))
        })
    };

    let tool_type = match kind {
        ToolKind::LocalModule => ToolType::LocalModule {
            entry: toml_tool.entry.clone().unwrap_or_else(|| id.clone()),
        },
        ToolKind::ShellCommand => {
            let language = toml_tool.language.as_deref().unwrap_or("shell");
            ToolType::ShellCommand {
                language: Language::from_str(language).ok_or_else(|| {
                    ToolgateError::Validation(format!("Invalid language '{}' for tool '{}'", language, toml_tool.name))
                })?,
            }
        }
        ToolKind::HttpApi => ToolType::HttpApi { endpoint: endpoint()? },
        ToolKind::CloudDevTool => ToolType::CloudDevTool { endpoint: endpoint()? },
        ToolKind::MarketplaceTool => ToolType::MarketplaceTool { endpoint: endpoint()? },
        ToolKind::AutomationTool => ToolType::AutomationTool { endpoint: endpoint()? },
        ToolKind::UnifiedSmartTool => ToolType::UnifiedSmartTool { endpoint: endpoint()? },
        ToolKind::McpComponent => {
            let variant = toml_tool.variant.as_deref().unwrap_or("component");
            ToolType::McpComponent {
                variant: McpVariant::from_str(variant).ok_or_else(|| {
                    ToolgateError::Validation(format!("Invalid MCP variant '{}' for tool '{}'", variant, toml_tool.name))
                })?,
                endpoint: endpoint()?,
            }
        }
    };

    let mut tool = ToolRecord::new(toml_tool.name, toml_tool.description, tool_type)
        .with_id(id)
        .with_capabilities(toml_tool.capabilities)
        .with_metrics(toml_tool.performance)
        .with_cost(toml_tool.cost)
        .with_quality(toml_tool.quality);

    if let Some(version) = toml_tool.version {
        tool = tool.with_version(version);
    }
    if let Some(platform) = toml_tool.platform {
        tool = tool.with_platform(platform);
    }
    if let Some(timeout) = toml_tool.timeout_ms {
        tool = tool.with_timeout(timeout);
    }

    Ok(tool)
}
