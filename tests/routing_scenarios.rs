//! Routing scenario integration tests
//!
//! Drives the catalog and routing engine through the public API.

use std::sync::Arc;

use toolgate::catalog::{Catalog, CostModel, PerformanceMetrics, ToolRecord, ToolType};
use toolgate::error::{Result, ToolgateError};
use toolgate::routing::{ConstraintSet, DisqualificationReason, RoutingConfig, RoutingEngine, RoutingFailure};

fn search_tool(id: &str, cost: CostModel, success_rate: f64) -> ToolRecord {
    ToolRecord::new(
        format!("Tool {}", id.to_uppercase()),
        "",
        ToolType::HttpApi {
            endpoint: format!("https://{}.tools.test", id),
        },
    )
    .with_id(id)
    .with_capabilities(["search"])
    .with_cost(cost)
    .with_metrics(PerformanceMetrics {
        success_rate,
        ..Default::default()
    })
}

/// Catalog with a free and a paid search tool
fn search_catalog() -> Result<Arc<Catalog>> {
    let catalog = Arc::new(Catalog::new());
    catalog.register(search_tool("a", CostModel::free(), 0.95))?;
    catalog.register(search_tool("b", CostModel::paid(0.02), 0.99))?;
    Ok(catalog)
}

#[test]
fn test_paid_tool_over_ceiling_is_disqualified() -> Result<()> {
    let engine = RoutingEngine::new(search_catalog()?);
    let decision = engine.route("search the web", &ConstraintSet::unconstrained().with_max_cost(0.01));

    assert!(decision.success);
    assert_eq!(decision.selected_id(), Some("a"));
    assert!(!decision.fallback_used);

    let b = decision.score_for("b").expect("b should carry a score");
    assert!(matches!(
        b.disqualified_reasons.as_slice(),
        [DisqualificationReason::CostExceeded { .. }]
    ));
    assert_eq!(b.disqualified_reasons[0].code(), "cost_exceeded");
    Ok(())
}

#[test]
fn test_free_tool_passes_any_cost_ceiling() -> Result<()> {
    let engine = RoutingEngine::new(search_catalog()?);
    let decision = engine.route("search the web", &ConstraintSet::unconstrained().with_max_cost(0.001));

    assert!(decision.success);
    assert_eq!(decision.selected_id(), Some("a"));
    assert!(!decision.fallback_used);
    Ok(())
}

#[test]
fn test_no_capability_match() -> Result<()> {
    let engine = RoutingEngine::new(search_catalog()?);
    let decision = engine.route("translate this document", &ConstraintSet::unconstrained());

    assert!(!decision.success);
    assert!(decision.selected_tool.is_none());
    assert!(decision.alternatives.is_empty());
    assert_eq!(decision.failure, Some(RoutingFailure::NoCandidate));
    assert!(decision.rationale.iter().any(|r| r.contains("no capability match")));

    let err = decision.into_result().unwrap_err();
    assert!(matches!(err, ToolgateError::NoCandidate(_)));
    Ok(())
}

#[test]
fn test_fallback_relaxes_constraints() -> Result<()> {
    let catalog = Arc::new(Catalog::new());
    catalog.register(search_tool("slow", CostModel::paid(0.5), 0.8))?;
    let engine = RoutingEngine::new(Arc::clone(&catalog));

    let constraints = ConstraintSet::unconstrained()
        .with_max_cost(0.01)
        .with_min_success_rate(0.9);
    let decision = engine.route("search", &constraints);

    assert!(decision.success);
    assert!(decision.fallback_used);
    assert_eq!(decision.selected_id(), Some("slow"));
    assert!(decision.rationale.iter().any(|r| r.contains("constraints relaxed")));
    Ok(())
}

#[test]
fn test_fallback_disabled_fails_with_every_reason() -> Result<()> {
    let catalog = Arc::new(Catalog::new());
    catalog.register(search_tool("slow", CostModel::paid(0.5), 0.8))?;
    let config = RoutingConfig {
        intelligent_fallback: false,
        ..Default::default()
    };
    let engine = RoutingEngine::with_config(catalog, config);

    let constraints = ConstraintSet::unconstrained()
        .with_max_cost(0.01)
        .with_min_success_rate(0.9);
    let decision = engine.route("search", &constraints);

    assert!(!decision.success);
    assert_eq!(decision.failure, Some(RoutingFailure::ConstraintUnsatisfiable));
    let codes: Vec<&str> = decision.scores[0]
        .disqualified_reasons
        .iter()
        .map(|r| r.code())
        .collect();
    assert_eq!(codes, vec!["cost_exceeded", "success_rate_below_floor"]);
    assert!(matches!(
        decision.into_result(),
        Err(ToolgateError::ConstraintUnsatisfiable(_))
    ));
    Ok(())
}

#[test]
fn test_repeated_routes_are_identical() -> Result<()> {
    let catalog = Arc::new(Catalog::new());
    for (i, rate) in [0.9, 0.95, 0.9, 0.99, 0.95].into_iter().enumerate() {
        catalog.register(search_tool(&format!("t{}", i), CostModel::free(), rate))?;
    }
    let engine = RoutingEngine::new(catalog);

    let first = engine.route("search", &ConstraintSet::unconstrained());
    for _ in 0..10 {
        let again = engine.route("search", &ConstraintSet::unconstrained());
        assert_eq!(again.selected_id(), first.selected_id());
        assert_eq!(again.alternative_ids(), first.alternative_ids());
    }
    assert_eq!(first.selected_id(), Some("t3"));
    assert_eq!(first.alternatives.len(), 3);
    Ok(())
}

#[test]
fn test_duplicate_id_rejected() -> Result<()> {
    let catalog = search_catalog()?;
    let err = catalog
        .register(search_tool("a", CostModel::paid(0.1), 0.5))
        .unwrap_err();
    assert!(matches!(err, ToolgateError::DuplicateId(_)));
    assert_eq!(catalog.len(), 2);
    assert!(catalog.get("a")?.is_free());
    Ok(())
}

#[test]
fn test_remove_is_idempotent() -> Result<()> {
    let catalog = search_catalog()?;
    assert!(catalog.remove("a").is_some());
    assert!(catalog.remove("a").is_none());
    assert!(matches!(catalog.get("a"), Err(ToolgateError::NotFound(_))));
    Ok(())
}

#[test]
fn test_routing_reads_snapshot_while_catalog_changes() -> Result<()> {
    let catalog = search_catalog()?;
    let engine = RoutingEngine::new(Arc::clone(&catalog));
    let snapshot = catalog.snapshot();

    catalog.remove("a");
    let decision = engine.route_snapshot("search", &ConstraintSet::unconstrained(), &snapshot);
    assert_eq!(decision.selected_id(), Some("a"));

    let live = engine.route("search", &ConstraintSet::unconstrained());
    assert_eq!(live.selected_id(), Some("b"));
    Ok(())
}
