//! End-to-end orchestrator flow: config, catalog files, routing, execution,
//! registry sync and stats.

use std::fs;
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use toolgate::catalog::{ToolFilter, ToolKind};
use toolgate::config::{Config, EnvOverrides};
use toolgate::dispatch::{ExecutionContext, ExecutionErrorKind};
use toolgate::error::{Result, ToolgateError};
use toolgate::orchestrator::{RouteContext, ToolOrchestrator};
use toolgate::registry::{LocalRegistry, LocalToolInfo, LocalToolKind};
use toolgate::routing::ConstraintSet;

const CONFIG: &str = r#"
agent_core:
  max_concurrent_requests: 2
  default_timeout: 5
smart_engine:
  cost_budget:
    max_cost_per_call: 0.05
    monthly_budget: 1.0
adapter_mcp:
  enable_adapters: false
"#;

const TOOLS: &str = r#"
[[tool]]
id = "summarizer"
name = "Summarizer"
description = "Summarize long documents"
kind = "local_module"
entry = "summarize"
capabilities = ["summarization", "text"]

[[tool]]
id = "premium-summarizer"
name = "Premium Summarizer"
description = "High quality document summaries"
kind = "local_module"
entry = "summarize"
platform = "cloud"
capabilities = ["summarization"]
performance = { avg_response_time = 200.0, success_rate = 0.99, throughput = 50.0, reliability_score = 0.99 }
cost = { type = "paid", cost_per_call = 0.25, currency = "USD" }

[[tool]]
name = "Broken"
kind = "http_api"
endpoint = "ftp://nowhere"
capabilities = ["summarization"]
"#;

fn setup() -> Result<(TempDir, ToolOrchestrator)> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("tools.toml"), TOOLS)?;

    let mut config = Config::from_yaml_str(CONFIG)?;
    config.finish(&EnvOverrides::default());
    config.validate()?;

    let pattern = dir.path().join("*.toml").display().to_string();
    let orchestrator = ToolOrchestrator::bootstrap(config, &[pattern])?.configure_dispatcher(|dispatcher| {
        dispatcher.with_handler("summarize", |payload: Value| -> Result<Value> {
            let text = payload
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolgateError::Validation("missing 'text'".to_string()))?;
            Ok(json!({ "summary": text.split_whitespace().take(3).collect::<Vec<_>>().join(" ") }))
        })
    });
    Ok((dir, orchestrator))
}

#[test]
fn test_bootstrap_skips_malformed_tools() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let ids: Vec<String> = orchestrator
        .list_tools(&ToolFilter::all())
        .iter()
        .map(|t| t.id.clone())
        .collect();
    assert_eq!(ids, vec!["premium-summarizer", "summarizer"]);

    let free = orchestrator.list_tools(&ToolFilter::all().free_only());
    assert_eq!(free.len(), 1);
    let local = orchestrator.list_tools(&ToolFilter::all().with_kind(ToolKind::LocalModule));
    assert_eq!(local.len(), 2);
    Ok(())
}

#[test]
fn test_optimize_prefers_budget_compliant_tool() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let optimized = orchestrator.optimize("summarize this document", ConstraintSet::unconstrained());

    assert_eq!(optimized.applied_constraints.max_cost_per_call, Some(0.05));
    assert_eq!(optimized.decision.selected_id(), Some("summarizer"));
    assert!(!optimized.decision.fallback_used);
    Ok(())
}

#[tokio::test]
async fn test_execute_request_runs_selected_tool() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let result = orchestrator
        .execute_request(
            "summarize this document",
            json!({"text": "one two three four five"}),
            ConstraintSet::unconstrained().with_max_cost(0.0),
            &ExecutionContext::default(),
        )
        .await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.tool_id, "summarizer");
    assert_eq!(result.output["summary"], "one two three");

    let stats = orchestrator.stats();
    assert_eq!(stats.selections_made, 1);
    assert_eq!(stats.cost_optimized_count, 1);
    assert_eq!(stats.executions, 1);
    assert_eq!(stats.total_spend, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_handler_error_is_reported() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let result = orchestrator
        .execute("summarizer", json!({"wrong": true}), &ExecutionContext::default())
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ExecutionErrorKind::InvalidRequest));
    assert_eq!(orchestrator.stats().execution_failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_paid_execution_records_spend() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let result = orchestrator
        .execute("premium-summarizer", json!({"text": "a b c d"}), &ExecutionContext::default())
        .await;
    assert!(result.success);

    let stats = orchestrator.stats();
    assert!((stats.total_spend - 0.25).abs() < 1e-9);
    assert!((orchestrator.remaining_budget() - 0.75).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_executions_share_limit() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let orchestrator = Arc::new(orchestrator);

    let mut handles = Vec::new();
    for i in 0..8 {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .execute("summarizer", json!({ "text": format!("call {}", i) }), &ExecutionContext::default())
                .await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.success);
    }
    assert_eq!(orchestrator.stats().executions, 8);
    Ok(())
}

#[tokio::test]
async fn test_route_batch_mixed_requirements() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let orchestrator = Arc::new(orchestrator);
    let decisions = orchestrator
        .route_batch(&["summarization", "image generation"], RouteContext::default())
        .await;
    assert!(decisions[0].success);
    assert!(!decisions[1].success);

    let stats = orchestrator.stats();
    assert_eq!(stats.selections_made, 1);
    assert_eq!(stats.failed_routes, 1);
    Ok(())
}

#[test]
fn test_local_registry_round_trip() -> Result<()> {
    let (_dir, orchestrator) = setup()?;
    let local = Arc::new(LocalRegistry::new());
    local.insert(
        LocalToolInfo::new(
            "wordcount",
            "Word Count",
            LocalToolKind::Module {
                entry: "echo".to_string(),
            },
        )
        .with_capabilities(["counting"]),
    );

    let sync = orchestrator.synchronizer(Arc::clone(&local));
    let report = sync.sync_local_to_catalog();
    assert_eq!(report.synced, vec!["wordcount"]);
    assert_eq!(
        orchestrator.route("counting", ConstraintSet::unconstrained()).selected_id(),
        Some("wordcount")
    );

    let mirrored = sync.sync_catalog_to_local();
    assert_eq!(mirrored.synced, vec!["premium-summarizer"]);
    assert_eq!(local.len(), 2);
    Ok(())
}
