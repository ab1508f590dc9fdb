use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;

use toolgate::catalog::{ToolFilter, ToolKind, ToolRecord};
use toolgate::cli::{Cli, Commands, ConfigCommands, ToolsCommands};
use toolgate::config::Config;
use toolgate::dispatch::ExecutionContext;
use toolgate::orchestrator::{OptimizedDecision, ToolOrchestrator};
use toolgate::routing::{ConstraintSet, RoutingDecision};

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolgate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("toolgate.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none()
        && let Some(level) = config.logging.level_filter()
    {
        builder.filter_level(level);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command, &config);
    }

    config.validate().context("Invalid configuration")?;
    let orchestrator =
        ToolOrchestrator::bootstrap(config, &cli.catalogs).context("Failed to load tool catalog")?;
    if cli.is_verbose() {
        println!("{} {} tools", "Catalog:".cyan(), orchestrator.catalog().len());
    }

    match &cli.command {
        Commands::Route {
            requirement,
            constraints,
            json,
        } => handle_route_command(&orchestrator, requirement, constraints.to_constraints(), *json),
        Commands::Optimize {
            requirement,
            constraints,
            json,
        } => handle_optimize_command(&orchestrator, requirement, constraints.to_constraints(), *json),
        Commands::Execute {
            tool_id,
            payload,
            timeout_ms,
        } => handle_execute_command(&orchestrator, tool_id, payload, *timeout_ms).await,
        Commands::Tools { command } => handle_tools_command(&orchestrator, command),
        Commands::Config { .. } => Ok(()),
    }
}

fn handle_route_command(
    orchestrator: &ToolOrchestrator,
    requirement: &str,
    constraints: ConstraintSet,
    json: bool,
) -> Result<()> {
    info!("Routing '{}' with {}", requirement, constraints);
    let decision = orchestrator.route(requirement, constraints);
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        print_decision(&decision);
    }
    if !decision.success {
        bail!("No tool selected for '{}'", requirement);
    }
    Ok(())
}

fn handle_optimize_command(
    orchestrator: &ToolOrchestrator,
    requirement: &str,
    constraints: ConstraintSet,
    json: bool,
) -> Result<()> {
    info!("Optimizing '{}'", requirement);
    let optimized = orchestrator.optimize(requirement, constraints);
    if json {
        println!("{}", serde_json::to_string_pretty(&optimized)?);
    } else {
        print_optimized(&optimized);
    }
    if !optimized.decision.success {
        bail!("No tool selected for '{}'", requirement);
    }
    Ok(())
}

async fn handle_execute_command(
    orchestrator: &ToolOrchestrator,
    tool_id: &str,
    payload: &str,
    timeout_ms: Option<u64>,
) -> Result<()> {
    info!("Executing '{}'", tool_id);
    let payload: serde_json::Value = serde_json::from_str(payload).context("Payload is not valid JSON")?;
    let mut ctx = ExecutionContext::default();
    if let Some(ms) = timeout_ms {
        ctx = ctx.with_timeout_ms(ms);
    }

    let result = orchestrator.execute(tool_id, payload, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        return Err(eyre!(
            "Execution of '{}' failed: {}",
            tool_id,
            result.error.unwrap_or_default()
        ));
    }
    Ok(())
}

fn handle_tools_command(orchestrator: &ToolOrchestrator, command: &ToolsCommands) -> Result<()> {
    match command {
        ToolsCommands::List {
            capability,
            kind,
            free,
            json,
        } => {
            let mut filter = ToolFilter::all();
            if let Some(capability) = capability {
                filter = filter.with_capability(capability);
            }
            if let Some(kind) = kind {
                let kind = ToolKind::from_str(kind).ok_or_else(|| eyre!("Unknown tool kind '{}'", kind))?;
                filter = filter.with_kind(kind);
            }
            if *free {
                filter = filter.free_only();
            }

            let tools = orchestrator.list_tools(&filter);
            if *json {
                let records: Vec<&ToolRecord> = tools.iter().map(|t| t.as_ref()).collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if tools.is_empty() {
                println!("{}", "No tools found".yellow());
            } else {
                for tool in &tools {
                    print_tool_line(tool);
                }
            }
        }
        ToolsCommands::Show { id } => {
            let tool = orchestrator.get_tool(id)?;
            println!("{}", serde_json::to_string_pretty(tool.as_ref())?);
        }
    }
    Ok(())
}

fn handle_config_command(command: &ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Validate => {
            let problems = config.problems();
            if problems.is_empty() {
                println!("{}", "Configuration is valid".green());
                return Ok(());
            }
            for problem in &problems {
                println!("  {} {}", "✗".red(), problem);
            }
            bail!("Configuration has {} problem(s)", problems.len());
        }
        ConfigCommands::Show => {
            print!("{}", serde_yaml::to_string(config)?);
        }
    }
    Ok(())
}

fn print_tool_line(tool: &ToolRecord) {
    let cost = if tool.is_free() {
        "free".green().to_string()
    } else {
        format!("{} {}", tool.cost_model.cost_per_call, tool.cost_model.currency).yellow().to_string()
    };
    let capabilities: Vec<&str> = tool.capabilities.iter().map(String::as_str).collect();
    println!(
        "{:<24} {:<18} {:<12} [{}]",
        tool.id.bold(),
        format!("{:?}", tool.tool_type.kind()),
        cost,
        capabilities.join(", ")
    );
}

fn print_decision(decision: &RoutingDecision) {
    match decision.selected_tool {
        Some(ref tool) => {
            let composite = decision
                .score_for(&tool.id)
                .map(|s| format!("{:.3}", s.composite_score))
                .unwrap_or_default();
            println!("{} {} ({})", "Selected:".green(), tool.id.bold(), composite);
            if decision.fallback_used {
                println!("  {}", "constraints relaxed".yellow());
            }
            for alternative in &decision.alternatives {
                println!("  {} {}", "alternative:".cyan(), alternative.id);
            }
        }
        None => println!("{} {}", "No tool selected for:".red(), decision.requirement),
    }
    for line in &decision.rationale {
        println!("  - {}", line);
    }
}

fn print_optimized(optimized: &OptimizedDecision) {
    println!("{} {}", "Constraints:".cyan(), optimized.applied_constraints);
    print_decision(&optimized.decision);
    for suggestion in &optimized.suggestions {
        println!("  {} {}", "suggestion:".magenta(), suggestion);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with the configured level
    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
