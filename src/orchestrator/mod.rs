//! Tool orchestrator
//!
//! Facade over the catalog, routing engine and dispatcher that the admin
//! surface drives. It owns the pieces of state that span requests: spend
//! tracking, the decision cache, the concurrency limit and the feedback of
//! observed latency and success into each tool's metrics.

mod cache;
mod stats;

pub use cache::DecisionCache;
pub use stats::{HIGH_SUCCESS_RATE, OrchestratorStats, StatsSnapshot};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::catalog::{Catalog, LoadReport, MetricsUpdate, ToolFilter, ToolKind, ToolRecord};
use crate::config::Config;
use crate::dispatch::{ExecutionContext, ExecutionDispatcher, ExecutionErrorKind, ExecutionResult};
use crate::error::Result;
use crate::id::generate_execution_id;
use crate::registry::{LocalRegistry, RegistrySynchronizer, SyncReport};
use crate::routing::{ConstraintSet, RoutingDecision, RoutingEngine, RoutingFailure, suggestions};

/// Weight of the newest observation in the metrics moving average
pub const EWMA_ALPHA: f64 = 0.2;

/// Tool kinds gated by `smart_engine.enable_cloud_tools`
const CLOUD_KINDS: &[ToolKind] = &[
    ToolKind::CloudDevTool,
    ToolKind::MarketplaceTool,
    ToolKind::AutomationTool,
    ToolKind::UnifiedSmartTool,
];

/// Per-request routing settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteContext {
    pub constraints: ConstraintSet,
    /// Skip the decision cache for this request
    pub bypass_cache: bool,
}

impl RouteContext {
    pub fn new(constraints: ConstraintSet) -> Self {
        Self {
            constraints,
            bypass_cache: false,
        }
    }

    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

impl From<ConstraintSet> for RouteContext {
    fn from(constraints: ConstraintSet) -> Self {
        Self::new(constraints)
    }
}

/// Decision produced by [`ToolOrchestrator::optimize`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedDecision {
    pub decision: RoutingDecision,
    /// Constraints after filling the unset dimensions from configuration
    pub applied_constraints: ConstraintSet,
    pub suggestions: Vec<String>,
}

#[derive(Debug)]
pub struct ToolOrchestrator {
    config: Config,
    catalog: Arc<Catalog>,
    engine: RoutingEngine,
    dispatcher: ExecutionDispatcher,
    stats: OrchestratorStats,
    cache: Option<DecisionCache>,
    limiter: Arc<Semaphore>,
}

impl ToolOrchestrator {
    /// Orchestrator over an existing catalog
    pub fn new(config: Config, catalog: Arc<Catalog>) -> Self {
        let engine = RoutingEngine::with_config(Arc::clone(&catalog), config.routing.clone());
        let dispatcher = ExecutionDispatcher::new(Arc::clone(&catalog))
            .with_default_timeout_ms(config.agent_core.default_timeout.saturating_mul(1000))
            .with_sandbox_options(config.sandbox);
        let cache = config
            .agent_core
            .enable_caching
            .then(|| DecisionCache::new(Duration::from_secs(config.agent_core.cache_ttl)));
        let limiter = Arc::new(Semaphore::new(config.agent_core.max_concurrent_requests.max(1)));

        Self {
            config,
            catalog,
            engine,
            dispatcher,
            stats: OrchestratorStats::new(),
            cache,
            limiter,
        }
    }

    /// Build a catalog from the configured catalog files plus `extra_patterns`,
    /// then import the configured adapters.
    pub fn bootstrap(config: Config, extra_patterns: &[String]) -> Result<Self> {
        let catalog = Arc::new(Catalog::new());
        let mut report = LoadReport::default();
        for pattern in config.tool_registry.catalog_paths.iter().chain(extra_patterns) {
            let loaded = catalog.load_glob(pattern)?;
            report.loaded.extend(loaded.loaded);
            report.skipped.extend(loaded.skipped);
        }
        if !report.skipped.is_empty() {
            log::warn!("Skipped {} malformed tool definitions", report.skipped.len());
        }

        let orchestrator = Self::new(config, catalog);
        let adapters = orchestrator.import_adapters();
        log::info!(
            "Bootstrapped catalog: {} tools loaded, {} adapters imported",
            report.loaded.len(),
            adapters.synced.len() + adapters.unchanged.len()
        );
        Ok(orchestrator)
    }

    /// Replace the dispatcher with a customized one
    pub fn configure_dispatcher(mut self, configure: impl FnOnce(ExecutionDispatcher) -> ExecutionDispatcher) -> Self {
        self.dispatcher = configure(self.dispatcher);
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Configured monthly budget minus recorded spend, floored at zero
    pub fn remaining_budget(&self) -> f64 {
        (self.config.smart_engine.cost_budget.monthly_budget - self.stats.total_spend()).max(0.0)
    }

    /// Route one requirement
    pub fn route(&self, requirement: &str, ctx: impl Into<RouteContext>) -> RoutingDecision {
        let ctx = ctx.into();
        let mut constraints = ctx.constraints;
        if constraints.monthly_budget.is_none() {
            constraints.monthly_budget = Some(self.remaining_budget());
        }

        let version = self.catalog.version();
        if !ctx.bypass_cache
            && let Some(ref cache) = self.cache
            && let Some(decision) = cache.get(requirement, &constraints, version)
        {
            log::debug!("Decision cache hit for '{}'", requirement);
            self.stats.record_cache_hit();
            self.stats.record_decision(&decision);
            return decision;
        }

        let decision = if self.config.smart_engine.enable_cloud_tools {
            self.engine.route(requirement, &constraints)
        } else {
            let snapshot: Vec<_> = self
                .catalog
                .snapshot()
                .into_iter()
                .filter(|tool| !CLOUD_KINDS.contains(&tool.tool_type.kind()))
                .collect();
            self.engine.route_snapshot(requirement, &constraints, &snapshot)
        };

        self.stats.record_decision(&decision);
        match decision.selected_id() {
            Some(id) => log::info!("Routed '{}' to '{}'", requirement, id),
            None => log::info!("No tool for '{}': {}", requirement, decision.rationale.join("; ")),
        }

        if let Some(ref cache) = self.cache {
            cache.insert(requirement, &constraints, version, decision.clone());
        }
        decision
    }

    /// Route several requirements under the same context
    ///
    /// Each requirement is routed on the blocking pool, so the batch runs in
    /// parallel. Decisions come back in input order.
    pub async fn route_batch<S: AsRef<str>>(
        self: &Arc<Self>,
        requirements: &[S],
        ctx: RouteContext,
    ) -> Vec<RoutingDecision> {
        let routes = requirements.iter().map(|requirement| {
            let orchestrator = Arc::clone(self);
            let requirement = requirement.as_ref().to_string();
            tokio::task::spawn_blocking(move || orchestrator.route(&requirement, ctx))
        });
        futures::future::join_all(routes)
            .await
            .into_iter()
            .zip(requirements)
            .map(|(joined, requirement)| {
                joined.unwrap_or_else(|e| {
                    log::error!("Routing task for '{}' failed: {}", requirement.as_ref(), e);
                    RoutingDecision::failed(
                        requirement.as_ref(),
                        RoutingFailure::NoCandidate,
                        vec![format!("routing task failed: {}", e)],
                        Vec::new(),
                    )
                })
            })
            .collect()
    }

    /// Constraints with every unset dimension taken from `smart_engine`
    pub fn default_constraints(&self) -> ConstraintSet {
        let engine = &self.config.smart_engine;
        ConstraintSet::unconstrained()
            .with_max_cost(engine.cost_budget.max_cost_per_call)
            .with_min_success_rate(engine.performance_thresholds.min_success_rate)
            .with_max_response_time(engine.performance_thresholds.max_response_time)
            .with_monthly_budget(self.remaining_budget())
    }

    /// Route under the configured budget and thresholds, with suggestions
    pub fn optimize(&self, requirement: &str, constraints: ConstraintSet) -> OptimizedDecision {
        let applied = constraints.or(&self.default_constraints());
        let decision = self.route(requirement, applied);
        let suggestions = suggestions::for_decision(&decision);
        OptimizedDecision {
            decision,
            applied_constraints: applied,
            suggestions,
        }
    }

    /// Execute a catalog tool by id
    pub async fn execute(&self, tool_id: &str, payload: Value, ctx: &ExecutionContext) -> ExecutionResult {
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => return ExecutionResult::failed(tool_id, ExecutionErrorKind::Unsupported, e.to_string(), 0),
        };
        let request_id = generate_execution_id(tool_id);
        log::debug!("{}: dispatching", request_id);
        let result = self.dispatcher.execute(tool_id, payload, ctx).await;
        log::debug!("{}: success={} in {}ms", request_id, result.success, result.latency_ms);
        self.record_execution(&result);
        result
    }

    /// Route `requirement`, then execute the selected tool
    pub async fn execute_request(
        &self,
        requirement: &str,
        payload: Value,
        constraints: ConstraintSet,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let decision = self.route(requirement, constraints);
        match decision.selected_id() {
            Some(id) => self.execute(id, payload, ctx).await,
            None => {
                let result = ExecutionResult::failed(
                    "",
                    ExecutionErrorKind::NoSelection,
                    format!("no tool selected for '{}': {}", requirement, decision.rationale.join("; ")),
                    0,
                );
                self.stats.record_execution(&result);
                result
            }
        }
    }

    fn record_execution(&self, result: &ExecutionResult) {
        self.stats.record_execution(result);

        let reached_tool = result.success
            || matches!(
                result.error_kind,
                Some(ExecutionErrorKind::Timeout | ExecutionErrorKind::Transport | ExecutionErrorKind::ToolFailed)
            );
        if !reached_tool {
            return;
        }
        let Ok(tool) = self.catalog.get(&result.tool_id) else {
            return;
        };

        if (result.success || result.error_kind == Some(ExecutionErrorKind::ToolFailed)) && !tool.is_free() {
            self.stats.add_spend(tool.effective_cost());
        }

        let metrics = &tool.performance_metrics;
        let observed_success = if result.success { 1.0 } else { 0.0 };
        let update = MetricsUpdate {
            avg_response_time: Some(ewma(metrics.avg_response_time, result.latency_ms as f64)),
            success_rate: Some(ewma(metrics.success_rate, observed_success)),
            ..Default::default()
        };
        if let Err(e) = self.catalog.update_metrics(&tool.id, &update) {
            log::warn!("Failed to update metrics for '{}': {}", tool.id, e);
        }
    }

    /// Register a tool, respecting `tool_registry.max_tools`
    pub fn register_tool(&self, record: ToolRecord) -> Result<String> {
        self.catalog.register_bounded(record, self.config.tool_registry.max_tools)
    }

    /// Remove a tool; removing an absent id is a no-op
    pub fn remove_tool(&self, id: &str) -> Option<Arc<ToolRecord>> {
        self.catalog.remove(id)
    }

    pub fn get_tool(&self, id: &str) -> Result<Arc<ToolRecord>> {
        self.catalog.get(id)
    }

    pub fn list_tools(&self, filter: &ToolFilter) -> Vec<Arc<ToolRecord>> {
        self.catalog.list(filter)
    }

    /// Register the configured MCP adapters as catalog tools
    pub fn import_adapters(&self) -> SyncReport {
        self.synchronizer(Arc::new(LocalRegistry::new()))
            .import_adapters(&self.config.adapter_mcp)
    }

    /// Synchronizer between `local` and this orchestrator's catalog
    pub fn synchronizer(&self, local: Arc<LocalRegistry>) -> RegistrySynchronizer {
        RegistrySynchronizer::new(Arc::clone(&self.catalog), local)
    }
}

fn ewma(current: f64, observed: f64) -> f64 {
    (1.0 - EWMA_ALPHA) * current + EWMA_ALPHA * observed
}
