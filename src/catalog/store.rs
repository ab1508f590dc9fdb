//! In-memory tool catalog
//!
//! The catalog owns every ToolRecord. Readers receive `Arc<ToolRecord>`
//! snapshots; writers replace records wholesale under the write lock, so a
//! reader never observes a half-updated record.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, ToolgateError};
use crate::id::generate_tool_id;

use super::record::{MetricsUpdate, ToolKind, ToolRecord};

/// Criteria for [`Catalog::list`]; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolFilter {
    pub capability: Option<String>,
    pub kind: Option<ToolKind>,
    pub platform: Option<String>,
    pub free_only: bool,
}

impl ToolFilter {
    /// Filter that matches every tool
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into().trim().to_lowercase());
        self
    }

    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn free_only(mut self) -> Self {
        self.free_only = true;
        self
    }

    /// Check whether a record passes this filter
    pub fn matches(&self, tool: &ToolRecord) -> bool {
        if let Some(ref capability) = self.capability
            && !tool.capabilities.contains(capability)
        {
            return false;
        }
        if let Some(kind) = self.kind
            && tool.tool_type.kind() != kind
        {
            return false;
        }
        if let Some(ref platform) = self.platform
            && &tool.platform != platform
        {
            return false;
        }
        !self.free_only || tool.is_free()
    }
}

/// Result of [`Catalog::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    Unchanged,
}

/// Shared catalog of tool records
#[derive(Debug, Default)]
pub struct Catalog {
    tools: RwLock<HashMap<String, Arc<ToolRecord>>>,
    version: AtomicU64,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ToolRecord>>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ToolRecord>>> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    /// Register a new tool, returning its id
    ///
    /// An empty id is replaced by a generated one. A caller-supplied id that
    /// is already registered fails with `DuplicateId` and leaves the existing
    /// record untouched.
    pub fn register(&self, record: ToolRecord) -> Result<String> {
        self.insert_new(record, None)
    }

    /// Register a new tool unless the catalog already holds `max` tools
    ///
    /// The size check and the insert happen under one write lock.
    pub fn register_bounded(&self, record: ToolRecord, max: usize) -> Result<String> {
        self.insert_new(record, Some(max))
    }

    fn insert_new(&self, record: ToolRecord, max: Option<usize>) -> Result<String> {
        let mut record = record.normalized()?;

        let mut tools = self.write();
        if let Some(max) = max
            && tools.len() >= max
        {
            return Err(ToolgateError::Validation(format!("catalog is full ({} tools)", max)));
        }
        if record.id.trim().is_empty() {
            let mut id = generate_tool_id();
            while tools.contains_key(&id) {
                id = generate_tool_id();
            }
            record.id = id;
        } else if tools.contains_key(&record.id) {
            return Err(ToolgateError::DuplicateId(record.id));
        }

        let id = record.id.clone();
        log::info!("Registered tool '{}' ({:?})", id, record.tool_type.kind());
        tools.insert(id.clone(), Arc::new(record));
        self.bump();
        Ok(id)
    }

    /// Insert or wholesale replace a record with an explicit id
    ///
    /// The original registration time is kept when replacing.
    pub fn upsert(&self, record: ToolRecord) -> Result<UpsertOutcome> {
        if record.id.trim().is_empty() {
            return Err(ToolgateError::Validation("upsert requires an explicit id".to_string()));
        }
        let mut record = record.normalized()?;

        let mut tools = self.write();
        let outcome = match tools.get(&record.id) {
            Some(existing) => {
                record.registered_at = existing.registered_at;
                if **existing == record {
                    return Ok(UpsertOutcome::Unchanged);
                }
                UpsertOutcome::Replaced
            }
            None => UpsertOutcome::Inserted,
        };
        log::debug!("Upserted tool '{}': {:?}", record.id, outcome);
        tools.insert(record.id.clone(), Arc::new(record));
        self.bump();
        Ok(outcome)
    }

    /// Get a tool by id
    pub fn get(&self, id: &str) -> Result<Arc<ToolRecord>> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| ToolgateError::NotFound(id.to_string()))
    }

    /// Remove a tool; removing an absent id is a no-op
    pub fn remove(&self, id: &str) -> Option<Arc<ToolRecord>> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            self.bump();
            log::info!("Removed tool '{}'", id);
        }
        removed
    }

    /// List tools passing the filter, ordered by id
    ///
    /// Records that no longer validate are skipped and logged rather than
    /// failing the whole listing.
    pub fn list(&self, filter: &ToolFilter) -> Vec<Arc<ToolRecord>> {
        let mut tools: Vec<Arc<ToolRecord>> = self
            .read()
            .values()
            .filter(|tool| match tool.validate() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Skipping malformed tool '{}': {}", tool.id, e);
                    false
                }
            })
            .filter(|tool| filter.matches(tool))
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.id.cmp(&b.id));
        tools
    }

    /// Immutable view of every valid tool, ordered by id
    pub fn snapshot(&self) -> Vec<Arc<ToolRecord>> {
        self.list(&ToolFilter::all())
    }

    /// Merge partial metrics into a tool, replacing the record wholesale
    pub fn update_metrics(&self, id: &str, update: &MetricsUpdate) -> Result<Arc<ToolRecord>> {
        let mut tools = self.write();
        let current = tools
            .get(id)
            .ok_or_else(|| ToolgateError::NotFound(id.to_string()))?;

        let metrics = update.apply(&current.performance_metrics)?;
        let mut updated = ToolRecord::clone(current);
        updated.performance_metrics = metrics;
        let updated = Arc::new(updated);

        tools.insert(id.to_string(), Arc::clone(&updated));
        self.bump();
        Ok(updated)
    }

    /// Check if a tool exists
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Monotonic counter bumped by every successful write
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::{CostModel, ToolType};

    fn tool(id: &str, caps: &[&str]) -> ToolRecord {
        ToolRecord::new(
            id,
            format!("{} tool", id),
            ToolType::LocalModule {
                entry: id.to_string(),
            },
        )
        .with_id(id)
        .with_capabilities(caps.iter().copied())
    }

    #[test]
    fn test_catalog_new_empty() {
        let catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.version(), 0);
    }

    #[test]
    fn test_register_and_get() {
        let catalog = Catalog::new();
        let id = catalog.register(tool("search", &["search"])).unwrap();
        assert_eq!(id, "search");

        let fetched = catalog.get("search").unwrap();
        assert_eq!(fetched.name, "search");
        assert!(fetched.capabilities.contains("search"));
    }

    #[test]
    fn test_register_generates_id() {
        let catalog = Catalog::new();
        let record = ToolRecord::new(
            "Unnamed",
            "",
            ToolType::LocalModule {
                entry: "e".to_string(),
            },
        );
        let id = catalog.register(record).unwrap();
        assert!(id.starts_with("tool-"));
        assert!(catalog.contains(&id));
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let catalog = Catalog::new();
        catalog.register(tool("search", &["search"])).unwrap();

        let second = tool("search", &["other"]);
        let err = catalog.register(second).unwrap_err();
        assert!(matches!(err, ToolgateError::DuplicateId(ref id) if id == "search"));

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("search").unwrap().capabilities.contains("search"));
    }

    #[test]
    fn test_register_invalid_rejected() {
        let catalog = Catalog::new();
        let bad = tool("bad", &["x"]).with_cost(CostModel::paid(-1.0));
        assert!(matches!(catalog.register(bad), Err(ToolgateError::Validation(_))));
        assert!(catalog.is_empty());
        assert_eq!(catalog.version(), 0);
    }

    #[test]
    fn test_get_nonexistent() {
        let catalog = Catalog::new();
        assert!(matches!(catalog.get("missing"), Err(ToolgateError::NotFound(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let catalog = Catalog::new();
        catalog.register(tool("search", &["search"])).unwrap();

        assert!(catalog.remove("search").is_some());
        assert!(catalog.remove("search").is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let catalog = Catalog::new();
        catalog.register(tool("zeta", &["search"])).unwrap();
        catalog.register(tool("alpha", &["search", "web"])).unwrap();
        catalog
            .register(tool("paid", &["web"]).with_cost(CostModel::paid(0.1)))
            .unwrap();

        let all: Vec<String> = catalog.snapshot().iter().map(|t| t.id.clone()).collect();
        assert_eq!(all, vec!["alpha", "paid", "zeta"]);

        let search = catalog.list(&ToolFilter::all().with_capability("SEARCH"));
        assert_eq!(search.len(), 2);

        let free_web = catalog.list(&ToolFilter::all().with_capability("web").free_only());
        assert_eq!(free_web.len(), 1);
        assert_eq!(free_web[0].id, "alpha");

        let local = catalog.list(&ToolFilter::all().with_kind(ToolKind::LocalModule));
        assert_eq!(local.len(), 3);
        assert!(catalog.list(&ToolFilter::all().with_kind(ToolKind::HttpApi)).is_empty());
    }

    #[test]
    fn test_update_metrics_replaces_record() {
        let catalog = Catalog::new();
        catalog.register(tool("search", &["search"])).unwrap();
        let before = catalog.get("search").unwrap();

        let update = MetricsUpdate {
            avg_response_time: Some(250.0),
            ..Default::default()
        };
        let after = catalog.update_metrics("search", &update).unwrap();

        assert_eq!(after.performance_metrics.avg_response_time, 250.0);
        // the earlier snapshot is untouched
        assert_eq!(before.performance_metrics.avg_response_time, 1000.0);
    }

    #[test]
    fn test_update_metrics_validation() {
        let catalog = Catalog::new();
        catalog.register(tool("search", &["search"])).unwrap();
        let version = catalog.version();

        let update = MetricsUpdate {
            success_rate: Some(2.0),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update_metrics("search", &update),
            Err(ToolgateError::Validation(_))
        ));
        assert_eq!(catalog.version(), version);
        assert_eq!(catalog.get("search").unwrap().performance_metrics.success_rate, 0.95);
    }

    #[test]
    fn test_update_metrics_unknown_tool() {
        let catalog = Catalog::new();
        let result = catalog.update_metrics("missing", &MetricsUpdate::default());
        assert!(matches!(result, Err(ToolgateError::NotFound(_))));
    }

    #[test]
    fn test_upsert_outcomes() {
        let catalog = Catalog::new();
        assert_eq!(catalog.upsert(tool("a", &["x"])).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(catalog.upsert(tool("a", &["x"])).unwrap(), UpsertOutcome::Unchanged);
        assert_eq!(catalog.upsert(tool("a", &["y"])).unwrap(), UpsertOutcome::Replaced);
        assert!(catalog.get("a").unwrap().capabilities.contains("y"));
    }

    #[test]
    fn test_upsert_requires_id() {
        let catalog = Catalog::new();
        assert!(catalog.upsert(tool("a", &["x"]).with_id("")).is_err());
    }

    #[test]
    fn test_version_bumps_on_writes_only() {
        let catalog = Catalog::new();
        catalog.register(tool("a", &["x"])).unwrap();
        assert_eq!(catalog.version(), 1);
        let _ = catalog.get("a");
        let _ = catalog.snapshot();
        assert_eq!(catalog.version(), 1);
        catalog.remove("missing");
        assert_eq!(catalog.version(), 1);
        catalog.remove("a");
        assert_eq!(catalog.version(), 2);
    }

    #[test]
    fn test_concurrent_duplicate_registration() {
        let catalog = Arc::new(Catalog::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || catalog.register(tool("race", &["x"])).is_ok())
            })
            .collect();
        let wins = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(wins, 1);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_register_bounded_rejects_when_full() {
        let catalog = Catalog::new();
        catalog.register_bounded(tool("a", &["x"]), 1).unwrap();
        let err = catalog.register_bounded(tool("b", &["x"]), 1).unwrap_err();
        assert!(matches!(err, ToolgateError::Validation(ref msg) if msg.contains("full")));
        assert!(!catalog.contains("b"));
        assert_eq!(catalog.version(), 1);
    }

    #[test]
    fn test_concurrent_bounded_registration() {
        for _ in 0..50 {
            let catalog = Arc::new(Catalog::new());
            let barrier = Arc::new(std::sync::Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let catalog = Arc::clone(&catalog);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        catalog.register_bounded(tool(&format!("tool-{}", i), &["x"]), 1).is_ok()
                    })
                })
                .collect();
            let wins = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
            assert_eq!(wins, 1);
            assert_eq!(catalog.len(), 1);
        }
    }
}
