//! Routing engine
//!
//! Drives one request through Matching -> Filtering -> (Fallback) -> Scoring
//! -> Decided over an immutable catalog snapshot. Routing never fails with
//! an error: "no suitable tool" is encoded in the returned decision.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ToolRecord};

use super::constraints::{ConstraintSet, DisqualificationReason, Disqualified, filter};
use super::decision::{RoutingDecision, RoutingFailure};
use super::matcher::{CapabilityMatcher, Candidate};
use super::scoring::{CandidateScore, RankedCandidate, Scorer, ScoringWeights};

/// Phases of a routing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPhase {
    Matching,
    Filtering,
    Fallback,
    Scoring,
    Decided,
}

/// Routing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Cap on alternatives returned beside the selected tool
    pub max_alternatives: usize,
    /// Re-run the filter unconstrained when nothing survives
    pub intelligent_fallback: bool,
    pub weights: ScoringWeights,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_alternatives: 3,
            intelligent_fallback: true,
            weights: ScoringWeights::default(),
        }
    }
}

/// Selects one tool per requirement from a shared catalog
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    catalog: Arc<Catalog>,
    matcher: CapabilityMatcher,
    scorer: Scorer,
    config: RoutingConfig,
}

/// Mutable state threaded through the phases of one request
#[derive(Default)]
struct RouteState {
    candidates: Vec<Candidate>,
    survivors: Vec<Candidate>,
    rejected: Vec<Disqualified>,
    ranked: Vec<RankedCandidate>,
    rationale: Vec<String>,
    fallback_used: bool,
    failure: Option<RoutingFailure>,
}

impl RoutingEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, RoutingConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: RoutingConfig) -> Self {
        Self {
            catalog,
            matcher: CapabilityMatcher::new(),
            scorer: Scorer::new(config.weights),
            config,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Route against a snapshot taken now
    pub fn route(&self, requirement: &str, constraints: &ConstraintSet) -> RoutingDecision {
        let snapshot = self.catalog.snapshot();
        self.route_snapshot(requirement, constraints, &snapshot)
    }

    /// Route against a caller-provided snapshot
    pub fn route_snapshot(
        &self,
        requirement: &str,
        constraints: &ConstraintSet,
        snapshot: &[Arc<ToolRecord>],
    ) -> RoutingDecision {
        let mut state = RouteState::default();
        let mut phase = RoutingPhase::Matching;

        loop {
            tracing::debug!(requirement = %requirement, phase = ?phase, "Routing phase");
            phase = match phase {
                RoutingPhase::Matching => self.run_matching(requirement, snapshot, &mut state),
                RoutingPhase::Filtering => self.run_filtering(constraints, &mut state),
                RoutingPhase::Fallback => self.run_fallback(constraints, &mut state),
                RoutingPhase::Scoring => self.run_scoring(&mut state),
                RoutingPhase::Decided => return self.decide(requirement, state),
            };
        }
    }

    fn run_matching(&self, requirement: &str, snapshot: &[Arc<ToolRecord>], state: &mut RouteState) -> RoutingPhase {
        state.candidates = self.matcher.match_requirement(requirement, snapshot);
        if state.candidates.is_empty() {
            state
                .rationale
                .push(format!("no capability match for requirement '{}'", requirement));
            state.failure = Some(RoutingFailure::NoCandidate);
            return RoutingPhase::Decided;
        }
        state.rationale.push(format!(
            "{} of {} tools match the requirement",
            state.candidates.len(),
            snapshot.len()
        ));
        RoutingPhase::Filtering
    }

    fn run_filtering(&self, constraints: &ConstraintSet, state: &mut RouteState) -> RoutingPhase {
        let outcome = filter(&state.candidates, constraints);
        for rejected in &outcome.disqualified {
            let reasons: Vec<String> = rejected.reasons.iter().map(ToString::to_string).collect();
            state.rationale.push(format!(
                "'{}' disqualified: {}",
                rejected.candidate.tool.id,
                reasons.join(", ")
            ));
        }
        state.rejected = outcome.disqualified;
        state.survivors = outcome.survivors;

        if state.survivors.is_empty() {
            tracing::debug!(
                candidates = state.candidates.len(),
                constraints = %constraints,
                "No candidate satisfies constraints"
            );
            RoutingPhase::Fallback
        } else {
            RoutingPhase::Scoring
        }
    }

    fn run_fallback(&self, constraints: &ConstraintSet, state: &mut RouteState) -> RoutingPhase {
        if !self.config.intelligent_fallback {
            state.rationale.push(format!(
                "no tool satisfies constraints ({}); fallback disabled",
                constraints
            ));
            state.failure = Some(RoutingFailure::ConstraintUnsatisfiable);
            return RoutingPhase::Decided;
        }

        let relaxed = filter(&state.candidates, &ConstraintSet::unconstrained());
        if relaxed.survivors.is_empty() {
            state
                .rationale
                .push("no tool satisfies the requirement even with constraints relaxed".to_string());
            state.failure = Some(RoutingFailure::ConstraintUnsatisfiable);
            return RoutingPhase::Decided;
        }

        log::info!(
            "Relaxing constraints ({}) for {} capability matches",
            constraints,
            relaxed.survivors.len()
        );
        state.rationale.push(format!(
            "constraints relaxed: no tool satisfied ({}), selecting among {} capability matches",
            constraints,
            relaxed.survivors.len()
        ));
        state.fallback_used = true;
        state.survivors = relaxed.survivors;
        RoutingPhase::Scoring
    }

    fn run_scoring(&self, state: &mut RouteState) -> RoutingPhase {
        state.ranked = self.scorer.score(&state.survivors);
        if let Some(top) = state.ranked.first() {
            let s = &top.score;
            state.rationale.push(format!(
                "selected '{}' (composite {:.3}: capability {:.2}, performance {:.2}, cost {:.2}, quality {:.2})",
                s.tool_id, s.composite_score, s.capability_match_score, s.performance_score, s.cost_score, s.quality_score
            ));
        }
        RoutingPhase::Decided
    }

    fn decide(&self, requirement: &str, state: RouteState) -> RoutingDecision {
        let RouteState {
            ranked,
            rejected,
            mut rationale,
            fallback_used,
            failure,
            ..
        } = state;

        let mut reasons: HashMap<String, Vec<DisqualificationReason>> = rejected
            .iter()
            .map(|d| (d.candidate.tool.id.clone(), d.reasons.clone()))
            .collect();

        let mut scores: Vec<CandidateScore> = ranked
            .iter()
            .map(|r| {
                let mut score = r.score.clone();
                // under fallback every ranked tool keeps the reasons it failed the strict pass
                if let Some(strict) = reasons.remove(&score.tool_id) {
                    score.disqualified_reasons = strict;
                }
                score
            })
            .collect();
        scores.extend(
            rejected
                .iter()
                .filter(|d| reasons.contains_key(&d.candidate.tool.id))
                .map(|d| CandidateScore::disqualified(&d.candidate, d.reasons.clone())),
        );

        if let Some(failure) = failure {
            log::debug!("Routing '{}' failed: {:?}", requirement, failure);
            return RoutingDecision::failed(requirement, failure, rationale, scores);
        }

        let mut tools = ranked.into_iter().map(|r| ToolRecord::clone(&r.tool));
        let selected_tool = tools.next();
        let alternatives: Vec<ToolRecord> = tools.take(self.config.max_alternatives).collect();
        if !alternatives.is_empty() {
            rationale.push(format!("{} alternative(s) available", alternatives.len()));
        }

        tracing::debug!(
            requirement = %requirement,
            selected = ?selected_tool.as_ref().map(|t| t.id.as_str()),
            fallback_used,
            "Routing decided"
        );

        RoutingDecision {
            success: selected_tool.is_some(),
            requirement: requirement.to_string(),
            selected_tool,
            alternatives,
            rationale,
            fallback_used,
            scores,
            failure: None,
        }
    }
}
