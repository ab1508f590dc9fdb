//! Constraint filtering
//!
//! Every candidate is checked against each dimension present in a
//! ConstraintSet. Failures are kept as typed reasons so a failed route can
//! explain itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ToolRecord;

use super::matcher::Candidate;

/// Per-request selection limits; `None` leaves a dimension unconstrained
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_per_call: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
}

impl ConstraintSet {
    /// No limits on any dimension
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn with_max_cost(mut self, max_cost_per_call: f64) -> Self {
        self.max_cost_per_call = Some(max_cost_per_call);
        self
    }

    pub fn with_min_success_rate(mut self, min_success_rate: f64) -> Self {
        self.min_success_rate = Some(min_success_rate);
        self
    }

    pub fn with_max_response_time(mut self, max_response_time_ms: f64) -> Self {
        self.max_response_time_ms = Some(max_response_time_ms);
        self
    }

    pub fn with_monthly_budget(mut self, monthly_budget: f64) -> Self {
        self.monthly_budget = Some(monthly_budget);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Self::unconstrained()
    }

    /// Fill dimensions left unset here from `defaults`
    pub fn or(self, defaults: &ConstraintSet) -> Self {
        Self {
            max_cost_per_call: self.max_cost_per_call.or(defaults.max_cost_per_call),
            min_success_rate: self.min_success_rate.or(defaults.min_success_rate),
            max_response_time_ms: self.max_response_time_ms.or(defaults.max_response_time_ms),
            monthly_budget: self.monthly_budget.or(defaults.monthly_budget),
        }
    }

    /// Every reason `tool` violates this set, in dimension order
    pub fn check(&self, tool: &ToolRecord) -> Vec<DisqualificationReason> {
        let mut reasons = Vec::new();
        let cost = tool.effective_cost();

        if let Some(limit) = self.max_cost_per_call
            && !tool.is_free()
            && cost > limit
        {
            reasons.push(DisqualificationReason::CostExceeded {
                cost_per_call: cost,
                limit,
            });
        }
        if let Some(floor) = self.min_success_rate
            && tool.performance_metrics.success_rate < floor
        {
            reasons.push(DisqualificationReason::SuccessRateBelowFloor {
                success_rate: tool.performance_metrics.success_rate,
                floor,
            });
        }
        if let Some(limit) = self.max_response_time_ms
            && tool.performance_metrics.avg_response_time > limit
        {
            reasons.push(DisqualificationReason::ResponseTimeExceeded {
                avg_response_time: tool.performance_metrics.avg_response_time,
                limit,
            });
        }
        if let Some(remaining) = self.monthly_budget
            && !tool.is_free()
            && cost > remaining
        {
            reasons.push(DisqualificationReason::BudgetExhausted {
                cost_per_call: cost,
                remaining,
            });
        }
        reasons
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.max_cost_per_call.map(|v| format!("max_cost_per_call={}", v)),
            self.min_success_rate.map(|v| format!("min_success_rate={}", v)),
            self.max_response_time_ms.map(|v| format!("max_response_time_ms={}", v)),
            self.monthly_budget.map(|v| format!("monthly_budget={}", v)),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            write!(f, "unconstrained")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Why a candidate was removed by the filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DisqualificationReason {
    CostExceeded { cost_per_call: f64, limit: f64 },
    SuccessRateBelowFloor { success_rate: f64, floor: f64 },
    ResponseTimeExceeded { avg_response_time: f64, limit: f64 },
    BudgetExhausted { cost_per_call: f64, remaining: f64 },
}

impl DisqualificationReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::CostExceeded { .. } => "cost_exceeded",
            Self::SuccessRateBelowFloor { .. } => "success_rate_below_floor",
            Self::ResponseTimeExceeded { .. } => "response_time_exceeded",
            Self::BudgetExhausted { .. } => "budget_exhausted",
        }
    }
}

impl fmt::Display for DisqualificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CostExceeded { cost_per_call, limit } => {
                write!(f, "cost_exceeded ({} per call > {})", cost_per_call, limit)
            }
            Self::SuccessRateBelowFloor { success_rate, floor } => {
                write!(f, "success_rate_below_floor ({} < {})", success_rate, floor)
            }
            Self::ResponseTimeExceeded {
                avg_response_time,
                limit,
            } => write!(f, "response_time_exceeded ({}ms > {}ms)", avg_response_time, limit),
            Self::BudgetExhausted {
                cost_per_call,
                remaining,
            } => write!(
                f,
                "budget_exhausted ({} per call > {} remaining)",
                cost_per_call, remaining
            ),
        }
    }
}

/// A candidate removed by the filter, with every reason it failed
#[derive(Debug, Clone)]
pub struct Disqualified {
    pub candidate: Candidate,
    pub reasons: Vec<DisqualificationReason>,
}

/// Output of [`filter`]
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Passing candidates, in input order
    pub survivors: Vec<Candidate>,
    pub disqualified: Vec<Disqualified>,
}

/// Split candidates into survivors and disqualified ones
pub fn filter(candidates: &[Candidate], constraints: &ConstraintSet) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    for candidate in candidates {
        let reasons = constraints.check(&candidate.tool);
        if reasons.is_empty() {
            outcome.survivors.push(candidate.clone());
        } else {
            outcome.disqualified.push(Disqualified {
                candidate: candidate.clone(),
                reasons,
            });
        }
    }
    outcome
}
