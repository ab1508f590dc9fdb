//! Two-way synchronization between the local registry and the catalog,
//! plus import of configured MCP adapters.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Catalog, McpVariant, ToolRecord, ToolType, UpsertOutcome};
use crate::config::AdapterMcpConfig;
use crate::id::slugify;

use super::local::{LOCAL_PLATFORM, LocalRegistry, LocalToolInfo};

/// Per-tool outcome of a sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Inserted or replaced
    pub synced: Vec<String>,
    pub unchanged: Vec<String>,
    /// Catalog records owned by another platform, left untouched
    pub skipped: Vec<String>,
    /// Tool id and the reason it was not synced
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.synced.len() + self.unchanged.len() + self.skipped.len() + self.failed.len()
    }
}

/// Mirrors tools between a [`LocalRegistry`] and a [`Catalog`]
#[derive(Debug, Clone)]
pub struct RegistrySynchronizer {
    catalog: Arc<Catalog>,
    local: Arc<LocalRegistry>,
}

impl RegistrySynchronizer {
    pub fn new(catalog: Arc<Catalog>, local: Arc<LocalRegistry>) -> Self {
        Self { catalog, local }
    }

    pub fn local(&self) -> &Arc<LocalRegistry> {
        &self.local
    }

    /// Upsert every local tool into the catalog
    ///
    /// Only identity fields come from the local entry. A record already in the
    /// catalog keeps its metrics, cost model and quality scores, and records
    /// owned by another platform are never overwritten.
    pub fn sync_local_to_catalog(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for info in self.local.list() {
            let mut record = info.to_record();
            if let Ok(existing) = self.catalog.get(&info.id) {
                if existing.platform != LOCAL_PLATFORM {
                    log::debug!("Skipping '{}': owned by platform '{}'", info.id, existing.platform);
                    report.skipped.push(info.id);
                    continue;
                }
                record.performance_metrics = existing.performance_metrics;
                record.cost_model = existing.cost_model.clone();
                record.quality_scores = existing.quality_scores;
            }
            self.upsert(record, &mut report);
        }
        log::info!(
            "Synced local registry to catalog: {} synced, {} unchanged, {} skipped, {} failed",
            report.synced.len(),
            report.unchanged.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    /// Mirror catalog tools that did not originate locally into the local registry
    pub fn sync_catalog_to_local(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for record in self.catalog.snapshot() {
            if record.platform == LOCAL_PLATFORM {
                continue;
            }
            let info = LocalToolInfo::from_record(&record);
            if self.local.get(&info.id).as_ref() == Some(&info) {
                report.unchanged.push(info.id);
            } else {
                report.synced.push(info.id.clone());
                self.local.insert(info);
            }
        }
        log::debug!("Mirrored {} catalog tools to local registry", report.synced.len());
        report
    }

    /// Register enabled adapters as MCP adapter components, high priority first
    pub fn import_adapters(&self, config: &AdapterMcpConfig) -> SyncReport {
        let mut report = SyncReport::default();
        if !config.enable_adapters {
            log::info!("Adapters disabled, skipping import");
            return report;
        }

        let mut adapters: Vec<_> = config.adapters.iter().filter(|(_, a)| a.enabled).collect();
        adapters.sort_by(|(a_name, a), (b_name, b)| a.priority.cmp(&b.priority).then_with(|| a_name.cmp(b_name)));

        for (name, adapter) in adapters {
            let id = slugify(name).unwrap_or_else(|| name.clone());
            let record = ToolRecord::new(
                name.as_str(),
                format!("MCP adapter '{}'", name),
                ToolType::McpComponent {
                    variant: McpVariant::Adapter,
                    endpoint: adapter.url.clone(),
                },
            )
            .with_id(id)
            .with_platform("mcp")
            .with_capabilities(adapter.capabilities.iter().cloned())
            .with_timeout(config.adapter_timeout.max(1).saturating_mul(1000));
            self.upsert(record, &mut report);
        }
        report
    }

    fn upsert(&self, record: ToolRecord, report: &mut SyncReport) {
        let id = record.id.clone();
        match self.catalog.upsert(record) {
            Ok(UpsertOutcome::Inserted | UpsertOutcome::Replaced) => report.synced.push(id),
            Ok(UpsertOutcome::Unchanged) => report.unchanged.push(id),
            Err(e) => {
                log::warn!("Failed to sync tool '{}': {}", id, e);
                report.failed.push((id, e.to_string()));
            }
        }
    }
}
