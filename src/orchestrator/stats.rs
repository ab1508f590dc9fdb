//! Aggregated orchestrator counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::dispatch::ExecutionResult;
use crate::routing::RoutingDecision;

/// Success rate above which a selection counts as a performance improvement
pub const HIGH_SUCCESS_RATE: f64 = 0.95;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub selections_made: u64,
    pub fallback_count: u64,
    pub cost_optimized_count: u64,
    pub performance_improvements: u64,
    pub failed_routes: u64,
    pub executions: u64,
    pub execution_failures: u64,
    pub total_spend: f64,
    pub cache_hits: u64,
}

#[derive(Debug, Default)]
pub struct OrchestratorStats {
    selections_made: AtomicU64,
    fallback_count: AtomicU64,
    cost_optimized_count: AtomicU64,
    performance_improvements: AtomicU64,
    failed_routes: AtomicU64,
    executions: AtomicU64,
    execution_failures: AtomicU64,
    cache_hits: AtomicU64,
    total_spend: Mutex<f64>,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl OrchestratorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&self, decision: &RoutingDecision) {
        let Some(ref selected) = decision.selected_tool else {
            bump(&self.failed_routes);
            return;
        };
        bump(&self.selections_made);
        if decision.fallback_used {
            bump(&self.fallback_count);
        }
        if selected.is_free() {
            bump(&self.cost_optimized_count);
        }
        if selected.performance_metrics.success_rate > HIGH_SUCCESS_RATE {
            bump(&self.performance_improvements);
        }
    }

    pub fn record_execution(&self, result: &ExecutionResult) {
        bump(&self.executions);
        if !result.success {
            bump(&self.execution_failures);
        }
    }

    pub fn record_cache_hit(&self) {
        bump(&self.cache_hits);
    }

    pub fn add_spend(&self, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            *self.total_spend.lock().unwrap_or_else(PoisonError::into_inner) += amount;
        }
    }

    pub fn total_spend(&self) -> f64 {
        *self.total_spend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            selections_made: self.selections_made.load(Ordering::Relaxed),
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
            cost_optimized_count: self.cost_optimized_count.load(Ordering::Relaxed),
            performance_improvements: self.performance_improvements.load(Ordering::Relaxed),
            failed_routes: self.failed_routes.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            total_spend: self.total_spend(),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CostModel, PerformanceMetrics, ToolRecord, ToolType};
    use crate::dispatch::ExecutionErrorKind;
    use crate::routing::RoutingFailure;

    fn decision(tool: Option<ToolRecord>, fallback_used: bool) -> RoutingDecision {
        match tool {
            Some(tool) => RoutingDecision {
                success: true,
                requirement: "r".to_string(),
                selected_tool: Some(tool),
                alternatives: Vec::new(),
                rationale: Vec::new(),
                fallback_used,
                scores: Vec::new(),
                failure: None,
            },
            None => RoutingDecision::failed("r", RoutingFailure::NoCandidate, Vec::new(), Vec::new()),
        }
    }

    fn tool(cost: CostModel, success_rate: f64) -> ToolRecord {
        ToolRecord::new(
            "t",
            "",
            ToolType::LocalModule {
                entry: "t".to_string(),
            },
        )
        .with_cost(cost)
        .with_metrics(PerformanceMetrics {
            success_rate,
            ..Default::default()
        })
    }

    #[test]
    fn test_record_decisions() {
        let stats = OrchestratorStats::new();
        stats.record_decision(&decision(Some(tool(CostModel::free(), 0.99)), false));
        stats.record_decision(&decision(Some(tool(CostModel::paid(0.1), 0.95)), true));
        stats.record_decision(&decision(None, false));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.selections_made, 2);
        assert_eq!(snapshot.fallback_count, 1);
        assert_eq!(snapshot.cost_optimized_count, 1);
        // 0.95 is not above the threshold
        assert_eq!(snapshot.performance_improvements, 1);
        assert_eq!(snapshot.failed_routes, 1);
    }

    #[test]
    fn test_record_executions_and_spend() {
        let stats = OrchestratorStats::new();
        stats.record_execution(&ExecutionResult::ok("t", serde_json::Value::Null, 5));
        stats.record_execution(&ExecutionResult::failed("t", ExecutionErrorKind::Timeout, "slow", 5));
        stats.add_spend(0.25);
        stats.add_spend(-1.0);
        stats.add_spend(f64::NAN);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.executions, 2);
        assert_eq!(snapshot.execution_failures, 1);
        assert_eq!(snapshot.total_spend, 0.25);
    }
}
