//! Execution dispatch
//!
//! Invokes a tool's execution contract according to its venue and
//! normalizes every outcome into an [`ExecutionResult`]. The dispatcher never
//! retries and never returns an error: failures are results with
//! `success = false`.

mod http;
mod local;
mod sandbox;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, ToolRecord, Venue};
use crate::error::ToolgateError;
use crate::routing::RoutingDecision;

pub use http::HttpInvoker;
pub use local::{LocalHandler, LocalHandlers};
pub use sandbox::{
    CodeSandbox, DENY_LIST, Language, ProcessSandbox, SandboxOptions, SandboxOutput, denied_pattern, truncate_output,
};

/// What to execute: an explicit tool id or the selection of a decision
#[derive(Debug, Clone, Copy)]
pub enum ExecutionTarget<'a> {
    Tool(&'a str),
    Decision(&'a RoutingDecision),
}

impl<'a> From<&'a str> for ExecutionTarget<'a> {
    fn from(id: &'a str) -> Self {
        Self::Tool(id)
    }
}

impl<'a> From<&'a RoutingDecision> for ExecutionTarget<'a> {
    fn from(decision: &'a RoutingDecision) -> Self {
        Self::Decision(decision)
    }
}

/// Per-call execution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    /// Overrides the tool's own timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Overrides the dispatcher's sandbox options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxOptions>,
}

impl ExecutionContext {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_sandbox(mut self, options: SandboxOptions) -> Self {
        self.sandbox = Some(options);
        self
    }
}

/// Failure category of an [`ExecutionResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    /// Unknown tool id
    NotFound,
    /// Routing produced no tool to execute
    NoSelection,
    /// Payload unusable for this tool
    InvalidRequest,
    /// Code refused by the deny-list
    Rejected,
    /// No handler or interpreter for the tool
    Unsupported,
    Timeout,
    Transport,
    /// The tool ran and reported failure
    ToolFailed,
}

impl ExecutionErrorKind {
    fn from_error(error: &ToolgateError) -> Self {
        match error {
            ToolgateError::NotFound(_) => Self::NotFound,
            ToolgateError::NoCandidate(_) | ToolgateError::ConstraintUnsatisfiable(_) => Self::NoSelection,
            ToolgateError::Validation(_) => Self::InvalidRequest,
            ToolgateError::ExecutionTimeout(_) => Self::Timeout,
            ToolgateError::ExecutionTransport(_) => Self::Transport,
            _ => Self::ToolFailed,
        }
    }
}

/// Normalized outcome of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ExecutionErrorKind>,
    pub latency_ms: u64,
    /// Empty when no tool could be resolved
    pub tool_id: String,
}

impl ExecutionResult {
    pub fn ok(tool_id: impl Into<String>, output: Value, latency_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            error_kind: None,
            latency_ms,
            tool_id: tool_id.into(),
        }
    }

    pub fn failed(
        tool_id: impl Into<String>,
        kind: ExecutionErrorKind,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            error_kind: Some(kind),
            latency_ms,
            tool_id: tool_id.into(),
        }
    }

    pub fn from_error(tool_id: impl Into<String>, error: &ToolgateError, latency_ms: u64) -> Self {
        Self::failed(tool_id, ExecutionErrorKind::from_error(error), error.to_string(), latency_ms)
    }

    pub fn is_timeout(&self) -> bool {
        self.error_kind == Some(ExecutionErrorKind::Timeout)
    }
}

/// Stateless executor of tool calls
pub struct ExecutionDispatcher {
    catalog: Arc<Catalog>,
    local: LocalHandlers,
    http: HttpInvoker,
    sandbox: Arc<dyn CodeSandbox>,
    sandbox_options: SandboxOptions,
    default_timeout_ms: Option<u64>,
}

impl std::fmt::Debug for ExecutionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionDispatcher")
            .field("local", &self.local)
            .field("sandbox_options", &self.sandbox_options)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl ExecutionDispatcher {
    /// Dispatcher with the built-in local handlers and a process sandbox
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            local: LocalHandlers::with_builtins(),
            http: HttpInvoker::new(),
            sandbox: Arc::new(ProcessSandbox::new()),
            sandbox_options: SandboxOptions::default(),
            default_timeout_ms: None,
        }
    }

    pub fn with_local_handlers(mut self, handlers: LocalHandlers) -> Self {
        self.local = handlers;
        self
    }

    /// Register one in-process handler
    pub fn with_handler(mut self, entry: impl Into<String>, handler: impl LocalHandler + 'static) -> Self {
        self.local.register(entry, handler);
        self
    }

    pub fn with_sandbox(mut self, sandbox: Arc<dyn CodeSandbox>) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_sandbox_options(mut self, options: SandboxOptions) -> Self {
        self.sandbox_options = options;
        self
    }

    /// Timeout for tools that declare none and calls that set none
    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Context timeout, then the tool's own, then the dispatcher default, then the type default
    pub fn resolve_timeout_ms(&self, tool: &ToolRecord, ctx: &ExecutionContext) -> u64 {
        ctx.timeout_ms
            .or(tool.timeout_ms)
            .or(self.default_timeout_ms)
            .unwrap_or_else(|| tool.tool_type.default_timeout_ms())
            .max(1)
    }

    /// Execute `target` with `payload`
    pub async fn execute<'a>(
        &self,
        target: impl Into<ExecutionTarget<'a>>,
        payload: Value,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let started = Instant::now();
        let tool = match target.into() {
            ExecutionTarget::Tool(id) => match self.catalog.get(id) {
                Ok(tool) => tool,
                Err(e) => return ExecutionResult::from_error(id, &e, elapsed_ms(started)),
            },
            ExecutionTarget::Decision(decision) => match decision.selected_tool {
                Some(ref tool) => Arc::new(tool.clone()),
                None => {
                    return ExecutionResult::failed(
                        "",
                        ExecutionErrorKind::NoSelection,
                        format!("routing selected no tool for '{}'", decision.requirement),
                        elapsed_ms(started),
                    );
                }
            },
        };

        let result = self.execute_tool(&tool, payload, ctx).await;
        log::debug!(
            "Executed '{}' in {}ms: success={}",
            result.tool_id,
            result.latency_ms,
            result.success
        );
        result
    }

    /// Execute an already-resolved tool
    pub async fn execute_tool(&self, tool: &ToolRecord, payload: Value, ctx: &ExecutionContext) -> ExecutionResult {
        let started = Instant::now();
        let timeout_ms = self.resolve_timeout_ms(tool, ctx);
        let timeout = Duration::from_millis(timeout_ms);

        let outcome = match tool.tool_type.venue() {
            Venue::InProcess(entry) => {
                let Some(handler) = self.local.get(entry) else {
                    return ExecutionResult::failed(
                        &tool.id,
                        ExecutionErrorKind::Unsupported,
                        format!("no local handler registered for '{}'", entry),
                        elapsed_ms(started),
                    );
                };
                tokio::time::timeout(timeout, handler.call(payload)).await
            }
            Venue::Remote(endpoint) => tokio::time::timeout(timeout, self.http.invoke(endpoint, &payload, timeout)).await,
            Venue::Sandbox(language) => {
                let code = match sandbox_code(&payload) {
                    Some(code) => code,
                    None => {
                        return ExecutionResult::failed(
                            &tool.id,
                            ExecutionErrorKind::InvalidRequest,
                            "sandbox payload must be a string or carry a 'code' string",
                            elapsed_ms(started),
                        );
                    }
                };
                if let Some(pattern) = denied_pattern(code) {
                    log::warn!("Refused code for '{}': contains '{}'", tool.id, pattern);
                    return ExecutionResult::failed(
                        &tool.id,
                        ExecutionErrorKind::Rejected,
                        format!("code contains denied pattern '{}'", pattern),
                        elapsed_ms(started),
                    );
                }
                return self.run_sandbox(tool, language, code, timeout_ms, ctx, started).await;
            }
        };

        let latency_ms = elapsed_ms(started);
        match outcome {
            Ok(Ok(output)) => ExecutionResult::ok(&tool.id, output, latency_ms),
            Ok(Err(e)) => ExecutionResult::from_error(&tool.id, &e, latency_ms),
            Err(_) => ExecutionResult::from_error(&tool.id, &ToolgateError::ExecutionTimeout(timeout_ms), latency_ms),
        }
    }

    async fn run_sandbox(
        &self,
        tool: &ToolRecord,
        language: Language,
        code: &str,
        timeout_ms: u64,
        ctx: &ExecutionContext,
        started: Instant,
    ) -> ExecutionResult {
        let mut options = ctx.sandbox.unwrap_or(self.sandbox_options);
        options.timeout_s = timeout_ms.div_ceil(1000);

        let run = self.sandbox.execute(language, code, &options);
        let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), run).await;
        let latency_ms = elapsed_ms(started);

        match outcome {
            Ok(Ok(output)) => {
                let error = (!output.success).then(|| {
                    if output.stderr.is_empty() {
                        format!("exited with code {:?}", output.return_code)
                    } else {
                        output.stderr.clone()
                    }
                });
                let value = serde_json::to_value(&output).unwrap_or(Value::Null);
                match error {
                    None => ExecutionResult::ok(&tool.id, value, latency_ms),
                    Some(error) => ExecutionResult {
                        output: value,
                        ..ExecutionResult::failed(&tool.id, ExecutionErrorKind::ToolFailed, error, latency_ms)
                    },
                }
            }
            Ok(Err(e)) => ExecutionResult::from_error(&tool.id, &e, latency_ms),
            Err(_) => ExecutionResult::from_error(&tool.id, &ToolgateError::ExecutionTimeout(timeout_ms), latency_ms),
        }
    }
}

fn sandbox_code(payload: &Value) -> Option<&str> {
    payload.as_str().or_else(|| payload.get("code").and_then(Value::as_str))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
