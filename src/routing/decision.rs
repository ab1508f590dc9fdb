use serde::{Deserialize, Serialize};

use crate::catalog::ToolRecord;
use crate::error::{Result, ToolgateError};

use super::scoring::CandidateScore;

/// Why routing produced no tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingFailure {
    NoCandidate,
    ConstraintUnsatisfiable,
}

/// Outcome of one routing request
///
/// Owned by the caller; records are snapshots taken when the decision was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub success: bool,
    pub requirement: String,
    pub selected_tool: Option<ToolRecord>,
    #[serde(default)]
    pub alternatives: Vec<ToolRecord>,
    #[serde(default)]
    pub rationale: Vec<String>,
    #[serde(default)]
    pub fallback_used: bool,
    /// Ranked scores first, then candidates that were disqualified
    #[serde(default)]
    pub scores: Vec<CandidateScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RoutingFailure>,
}

impl RoutingDecision {
    pub fn failed(
        requirement: impl Into<String>,
        failure: RoutingFailure,
        rationale: Vec<String>,
        scores: Vec<CandidateScore>,
    ) -> Self {
        Self {
            success: false,
            requirement: requirement.into(),
            selected_tool: None,
            alternatives: Vec::new(),
            rationale,
            fallback_used: false,
            scores,
            failure: Some(failure),
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_tool.as_ref().map(|t| t.id.as_str())
    }

    pub fn alternative_ids(&self) -> Vec<&str> {
        self.alternatives.iter().map(|t| t.id.as_str()).collect()
    }

    /// Score entry for a tool
    pub fn score_for(&self, tool_id: &str) -> Option<&CandidateScore> {
        self.scores.iter().find(|s| s.tool_id == tool_id)
    }

    /// Convert into the selected tool, or the error matching the failure
    pub fn into_result(self) -> Result<ToolRecord> {
        let explanation = self.rationale.join("; ");
        match (self.selected_tool, self.failure) {
            (Some(tool), _) => Ok(tool),
            (None, Some(RoutingFailure::ConstraintUnsatisfiable)) => {
                Err(ToolgateError::ConstraintUnsatisfiable(explanation))
            }
            (None, _) => Err(ToolgateError::NoCandidate(explanation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolType;

    #[test]
    fn test_failed_decision_shape() {
        let decision = RoutingDecision::failed(
            "translate this",
            RoutingFailure::NoCandidate,
            vec!["no capability match".to_string()],
            Vec::new(),
        );
        assert!(!decision.success);
        assert!(decision.selected_id().is_none());
        assert!(decision.alternatives.is_empty());
        assert!(matches!(decision.into_result(), Err(ToolgateError::NoCandidate(_))));
    }

    #[test]
    fn test_into_result_constraint_unsatisfiable() {
        let decision = RoutingDecision::failed(
            "search",
            RoutingFailure::ConstraintUnsatisfiable,
            vec!["a".to_string(), "b".to_string()],
            Vec::new(),
        );
        match decision.into_result() {
            Err(ToolgateError::ConstraintUnsatisfiable(msg)) => assert_eq!(msg, "a; b"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_into_result_success() {
        let tool = ToolRecord::new(
            "t",
            "",
            ToolType::LocalModule {
                entry: "t".to_string(),
            },
        )
        .with_id("t");
        let decision = RoutingDecision {
            success: true,
            requirement: "x".to_string(),
            selected_tool: Some(tool),
            alternatives: Vec::new(),
            rationale: Vec::new(),
            fallback_used: false,
            scores: Vec::new(),
            failure: None,
        };
        assert_eq!(decision.selected_id(), Some("t"));
        assert_eq!(decision.into_result().unwrap().id, "t");
    }

    #[test]
    fn test_failure_omitted_from_json_on_success() {
        let decision = RoutingDecision {
            success: true,
            requirement: "x".to_string(),
            selected_tool: None,
            alternatives: Vec::new(),
            rationale: Vec::new(),
            fallback_used: false,
            scores: Vec::new(),
            failure: None,
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert!(json.get("failure").is_none());
        assert_eq!(json["fallback_used"], false);
    }
}
