//! Plain local tool registry
//!
//! Holds the minimal descriptions local code registers with, before they are
//! enriched into catalog records.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::{PerformanceMetrics, ToolRecord, ToolType, Venue};
use crate::dispatch::Language;

/// Platform tag of catalog records that originate in the local registry
pub const LOCAL_PLATFORM: &str = "local";

/// How a local tool runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocalToolKind {
    Module { entry: String },
    HttpApi { endpoint: String },
    Shell { language: Language },
}

impl LocalToolKind {
    pub fn to_tool_type(&self) -> ToolType {
        match self {
            Self::Module { entry } => ToolType::LocalModule { entry: entry.clone() },
            Self::HttpApi { endpoint } => ToolType::HttpApi {
                endpoint: endpoint.clone(),
            },
            Self::Shell { language } => ToolType::ShellCommand { language: *language },
        }
    }

    /// Local view of any catalog tool type
    pub fn from_tool_type(tool_type: &ToolType) -> Self {
        match tool_type.venue() {
            Venue::InProcess(entry) => Self::Module {
                entry: entry.to_string(),
            },
            Venue::Remote(endpoint) => Self::HttpApi {
                endpoint: endpoint.to_string(),
            },
            Venue::Sandbox(language) => Self::Shell { language },
        }
    }
}

/// A tool as registered by local code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalToolInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: LocalToolKind,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl LocalToolInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: LocalToolKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            version: default_version(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Catalog record with the defaults assumed for local tools
    pub fn to_record(&self) -> ToolRecord {
        ToolRecord::new(&self.name, &self.description, self.kind.to_tool_type())
            .with_id(&self.id)
            .with_version(&self.version)
            .with_capabilities(self.capabilities.iter().cloned())
            .with_platform(LOCAL_PLATFORM)
            .with_metrics(PerformanceMetrics {
                avg_response_time: 500.0,
                success_rate: 0.95,
                throughput: 100.0,
                reliability_score: 0.9,
            })
    }

    /// Local view of a catalog record
    pub fn from_record(record: &ToolRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            kind: LocalToolKind::from_tool_type(&record.tool_type),
            version: record.version.clone(),
            capabilities: record.capabilities.iter().cloned().collect(),
        }
    }
}

/// In-memory local registry
#[derive(Debug, Default)]
pub struct LocalRegistry {
    tools: RwLock<BTreeMap<String, LocalToolInfo>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous entry
    pub fn insert(&self, info: LocalToolInfo) -> Option<LocalToolInfo> {
        self.tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(info.id.clone(), info)
    }

    pub fn get(&self, id: &str) -> Option<LocalToolInfo> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<LocalToolInfo> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner).remove(id)
    }

    /// All entries ordered by id
    pub fn list(&self) -> Vec<LocalToolInfo> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
