//! Tool routing - capability matching, constraint filtering, scoring and the
//! engine that ties them together.

mod constraints;
mod decision;
mod engine;
mod matcher;
mod scoring;
pub mod suggestions;

pub use constraints::{ConstraintSet, DisqualificationReason, Disqualified, FilterOutcome, filter};
pub use decision::{RoutingDecision, RoutingFailure};
pub use engine::{RoutingConfig, RoutingEngine, RoutingPhase};
pub use matcher::{Candidate, CapabilityMatcher};
pub use scoring::{CandidateScore, RankedCandidate, Scorer, ScoringWeights, cost_score, performance_score, quality_score};
