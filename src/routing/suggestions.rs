//! Advisory suggestions derived from an already-made decision.
//! Nothing here influences selection.

use crate::catalog::ToolRecord;

use super::decision::RoutingDecision;

/// Alternatives faster than this are worth pointing out
pub const FAST_RESPONSE_MS: f64 = 1000.0;
/// Rating at which an alternative counts as well-rated
pub const GOOD_RATING: f64 = 4.0;

/// Suggestions for a decision's selected tool, based on its alternatives
pub fn for_decision(decision: &RoutingDecision) -> Vec<String> {
    match decision.selected_tool {
        Some(ref selected) => optimization_suggestions(selected, &decision.alternatives),
        None => Vec::new(),
    }
}

/// Suggest cheaper, faster or better-rated alternatives to `selected`
pub fn optimization_suggestions(selected: &ToolRecord, alternatives: &[ToolRecord]) -> Vec<String> {
    let mut suggestions = Vec::new();

    if !selected.is_free()
        && let Some(free) = alternatives.iter().find(|t| t.is_free())
    {
        suggestions.push(format!(
            "'{}' is free and could replace '{}' ({} {} per call)",
            free.name, selected.name, selected.cost_model.cost_per_call, selected.cost_model.currency
        ));
    }

    if selected.performance_metrics.avg_response_time > FAST_RESPONSE_MS
        && let Some(fast) = alternatives
            .iter()
            .find(|t| t.performance_metrics.avg_response_time < FAST_RESPONSE_MS)
    {
        suggestions.push(format!(
            "'{}' responds in {:.0}ms versus {:.0}ms for '{}'",
            fast.name,
            fast.performance_metrics.avg_response_time,
            selected.performance_metrics.avg_response_time,
            selected.name
        ));
    }

    if selected.quality_scores.user_rating < GOOD_RATING
        && let Some(rated) = alternatives
            .iter()
            .find(|t| t.quality_scores.user_rating >= GOOD_RATING)
    {
        suggestions.push(format!(
            "'{}' is rated {:.1}/5 versus {:.1}/5 for '{}'",
            rated.name, rated.quality_scores.user_rating, selected.quality_scores.user_rating, selected.name
        ));
    }

    suggestions
}
