//! Code-execution sandbox
//!
//! The dispatcher treats code execution as one opaque capability behind the
//! [`CodeSandbox`] trait. [`ProcessSandbox`] is the stock implementation: it
//! runs the interpreter for the language as a child process and kills it when
//! the timeout expires.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Result, ToolgateError};

/// Languages the sandbox contract accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Shell,
    Sql,
}

impl Language {
    /// Parse from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "python3" | "py" => Some(Self::Python),
            "javascript" | "js" | "node" => Some(Self::Javascript),
            "shell" | "sh" | "bash" => Some(Self::Shell),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Shell => "shell",
            Self::Sql => "sql",
        }
    }
}

/// Code patterns refused before any sandbox sees them, matched case-insensitively
pub const DENY_LIST: &[&str] = &[
    "import os",
    "import subprocess",
    "eval(",
    "exec(",
    "__import__",
    "open(",
    "file(",
    "input(",
    "raw_input(",
    "rm -rf",
    "sudo",
    "chmod",
    "chown",
];

/// First deny-listed pattern found in `code`
pub fn denied_pattern(code: &str) -> Option<&'static str> {
    let lowered = code.to_lowercase();
    DENY_LIST.iter().copied().find(|pattern| lowered.contains(pattern))
}

/// Limits passed with every sandbox call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxOptions {
    pub timeout_s: u64,
    pub allow_network: bool,
    pub memory_limit_mb: u64,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            timeout_s: 30,
            allow_network: false,
            memory_limit_mb: 512,
        }
    }
}

/// What a sandbox run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process never ran or was killed by a signal
    pub return_code: Option<i32>,
    pub execution_time_s: f64,
}

impl SandboxOutput {
    fn unsupported(language: Language) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: format!("{} execution is not supported by this sandbox", language.as_str()),
            return_code: None,
            execution_time_s: 0.0,
        }
    }
}

/// Contract of the external code-execution collaborator
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Run `code`; fails with `ExecutionTimeout` when `options.timeout_s` elapses
    async fn execute(&self, language: Language, code: &str, options: &SandboxOptions) -> Result<SandboxOutput>;
}

/// Runs code through local interpreters
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    max_output_bytes: usize,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSandbox {
    pub fn new() -> Self {
        Self {
            max_output_bytes: 100_000,
        }
    }

    /// Set maximum captured size of stdout and stderr, each
    pub fn with_max_output(mut self, max_bytes: usize) -> Self {
        self.max_output_bytes = max_bytes;
        self
    }

    fn command(language: Language, code: &str) -> Option<Command> {
        let (program, flag) = match language {
            Language::Python => ("python3", "-c"),
            Language::Javascript => ("node", "-e"),
            Language::Shell => ("sh", "-c"),
            Language::Sql => return None,
        };
        let mut command = Command::new(program);
        command
            .arg(flag)
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Some(command)
    }
}

#[async_trait]
impl CodeSandbox for ProcessSandbox {
    async fn execute(&self, language: Language, code: &str, options: &SandboxOptions) -> Result<SandboxOutput> {
        let Some(mut command) = Self::command(language, code) else {
            return Ok(SandboxOutput::unsupported(language));
        };

        let started = Instant::now();
        let child = command
            .spawn()
            .map_err(|e| ToolgateError::ExecutionTransport(format!("Failed to spawn {}: {}", language.as_str(), e)))?;

        let timeout = Duration::from_secs(options.timeout_s);
        // dropping the child on timeout kills it
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(SandboxOutput {
                success: output.status.success(),
                stdout: truncate_output(String::from_utf8_lossy(&output.stdout).into_owned(), self.max_output_bytes),
                stderr: truncate_output(String::from_utf8_lossy(&output.stderr).into_owned(), self.max_output_bytes),
                return_code: output.status.code(),
                execution_time_s: started.elapsed().as_secs_f64(),
            }),
            Ok(Err(e)) => Err(ToolgateError::ExecutionTransport(format!("IO error: {}", e))),
            Err(_) => {
                log::warn!("{} sandbox run killed after {}s", language.as_str(), options.timeout_s);
                Err(ToolgateError::ExecutionTimeout(options.timeout_s.saturating_mul(1000)))
            }
        }
    }
}

/// Cut `output` to at most `max_bytes`, on a char boundary
pub fn truncate_output(mut output: String, max_bytes: usize) -> String {
    if output.len() > max_bytes {
        let mut cut = max_bytes;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n... [output truncated]");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str() {
        assert_eq!(Language::from_str("Python"), Some(Language::Python));
        assert_eq!(Language::from_str("js"), Some(Language::Javascript));
        assert_eq!(Language::from_str("bash"), Some(Language::Shell));
        assert_eq!(Language::from_str("sql"), Some(Language::Sql));
        assert_eq!(Language::from_str("cobol"), None);
    }

    #[test]
    fn test_language_serialization() {
        assert_eq!(serde_json::to_value(Language::Javascript).unwrap(), "javascript");
    }

    #[test]
    fn test_denied_pattern() {
        assert_eq!(denied_pattern("import os\nos.listdir()"), Some("import os"));
        assert_eq!(denied_pattern("SUDO reboot"), Some("sudo"));
        assert_eq!(denied_pattern("x = eval ('1')"), None);
        assert_eq!(denied_pattern("print(1 + 1)"), None);
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("short".to_string(), 10), "short");
        let cut = truncate_output("abcdef".to_string(), 3);
        assert!(cut.starts_with("abc\n"));
        assert!(cut.ends_with("[output truncated]"));
    }

    #[test]
    fn test_truncate_output_char_boundary() {
        let cut = truncate_output("日本語".to_string(), 4);
        assert!(cut.starts_with("日\n"));
    }

    #[tokio::test]
    async fn test_sql_unsupported() {
        let output = ProcessSandbox::new()
            .execute(Language::Sql, "select 1", &SandboxOptions::default())
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.stderr.contains("not supported"));
        assert_eq!(output.return_code, None);
    }

    #[tokio::test]
    async fn test_shell_success() {
        let output = ProcessSandbox::new()
            .execute(Language::Shell, "echo hello", &SandboxOptions::default())
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.return_code, Some(0));
    }

    #[tokio::test]
    async fn test_shell_failure_exit_code() {
        let output = ProcessSandbox::new()
            .execute(Language::Shell, "echo oops >&2; exit 3", &SandboxOptions::default())
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.return_code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_shell_timeout() {
        let options = SandboxOptions {
            timeout_s: 1,
            ..Default::default()
        };
        let result = ProcessSandbox::new().execute(Language::Shell, "sleep 5", &options).await;
        assert!(matches!(result, Err(ToolgateError::ExecutionTimeout(1000))));
    }

    #[tokio::test]
    async fn test_output_truncated() {
        let output = ProcessSandbox::new()
            .with_max_output(10)
            .execute(Language::Shell, "printf '%0100d' 0", &SandboxOptions::default())
            .await
            .unwrap();
        assert!(output.stdout.contains("[output truncated]"));
    }
}
