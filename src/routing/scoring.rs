//! Composite scoring and deterministic ranking of filtered candidates

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::ToolRecord;

use super::constraints::DisqualificationReason;
use super::matcher::Candidate;

/// Fixed weights of the four sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub capability: f64,
    pub performance: f64,
    pub cost: f64,
    pub quality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capability: 0.4,
            performance: 0.3,
            cost: 0.15,
            quality: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.capability + self.performance + self.cost + self.quality
    }

    /// Describe every way these weights are unusable
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, value) in [
            ("capability", self.capability),
            ("performance", self.performance),
            ("cost", self.cost),
            ("quality", self.quality),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                problems.push(format!("routing.weights.{} {} outside [0, 1]", name, value));
            }
        }
        if (self.sum() - 1.0).abs() > 1e-6 {
            problems.push(format!("routing.weights sum to {}, expected 1", self.sum()));
        }
        problems
    }
}

/// Per-candidate score breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub tool_id: String,
    pub capability_match_score: f64,
    pub performance_score: f64,
    pub cost_score: f64,
    pub quality_score: f64,
    pub composite_score: f64,
    #[serde(default)]
    pub disqualified_reasons: Vec<DisqualificationReason>,
}

impl CandidateScore {
    /// Entry for a candidate that never reached scoring
    pub fn disqualified(candidate: &Candidate, reasons: Vec<DisqualificationReason>) -> Self {
        Self {
            tool_id: candidate.tool.id.clone(),
            capability_match_score: candidate.capability_match_score,
            performance_score: 0.0,
            cost_score: 0.0,
            quality_score: 0.0,
            composite_score: 0.0,
            disqualified_reasons: reasons,
        }
    }
}

/// A scored survivor
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub tool: Arc<ToolRecord>,
    pub score: CandidateScore,
}

/// Ranks survivors by weighted composite score
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score and order survivors, best first
    ///
    /// Response time and cost are normalized against the largest value in
    /// this survivor set.
    pub fn score(&self, survivors: &[Candidate]) -> Vec<RankedCandidate> {
        let max_response = survivors
            .iter()
            .map(|c| c.tool.performance_metrics.avg_response_time)
            .fold(0.0_f64, f64::max);
        let max_cost = survivors
            .iter()
            .map(|c| c.tool.effective_cost())
            .fold(0.0_f64, f64::max);

        let mut ranked: Vec<RankedCandidate> = survivors
            .iter()
            .map(|c| {
                let performance_score = performance_score(&c.tool, max_response);
                let cost_score = cost_score(&c.tool, max_cost);
                let quality_score = quality_score(&c.tool);
                let capability_match_score = c.capability_match_score.clamp(0.0, 1.0);
                let composite_score = self.weights.capability * capability_match_score
                    + self.weights.performance * performance_score
                    + self.weights.cost * cost_score
                    + self.weights.quality * quality_score;

                RankedCandidate {
                    tool: Arc::clone(&c.tool),
                    score: CandidateScore {
                        tool_id: c.tool.id.clone(),
                        capability_match_score,
                        performance_score,
                        cost_score,
                        quality_score,
                        composite_score,
                        disqualified_reasons: Vec::new(),
                    },
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked
    }
}

/// Composite desc, then cost asc, then success rate desc, then id asc
fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .composite_score
        .total_cmp(&a.score.composite_score)
        .then_with(|| a.tool.effective_cost().total_cmp(&b.tool.effective_cost()))
        .then_with(|| {
            b.tool
                .performance_metrics
                .success_rate
                .total_cmp(&a.tool.performance_metrics.success_rate)
        })
        .then_with(|| a.tool.id.cmp(&b.tool.id))
}

pub fn performance_score(tool: &ToolRecord, max_response: f64) -> f64 {
    let metrics = &tool.performance_metrics;
    let speed = if max_response > 0.0 {
        1.0 - (metrics.avg_response_time / max_response).min(1.0)
    } else {
        1.0
    };
    ((speed + metrics.success_rate + metrics.reliability_score) / 3.0).clamp(0.0, 1.0)
}

pub fn cost_score(tool: &ToolRecord, max_cost: f64) -> f64 {
    if tool.is_free() {
        return 1.0;
    }
    if max_cost <= 0.0 {
        return 1.0;
    }
    (1.0 - (tool.effective_cost() / max_cost).min(1.0)).clamp(0.0, 1.0)
}

pub fn quality_score(tool: &ToolRecord) -> f64 {
    let quality = &tool.quality_scores;
    ((quality.user_rating / 5.0 + quality.documentation_quality + quality.community_support) / 3.0).clamp(0.0, 1.0)
}
