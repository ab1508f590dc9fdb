//! In-process handlers for local-module tools

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A local tool's entry point
#[async_trait]
pub trait LocalHandler: Send + Sync {
    async fn call(&self, payload: Value) -> Result<Value>;
}

#[async_trait]
impl<F> LocalHandler for F
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    async fn call(&self, payload: Value) -> Result<Value> {
        self(payload)
    }
}

/// Handlers keyed by a local module's `entry`
#[derive(Clone, Default)]
pub struct LocalHandlers {
    handlers: HashMap<String, Arc<dyn LocalHandler>>,
}

impl std::fmt::Debug for LocalHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalHandlers").field("entries", &self.entries()).finish()
    }
}

impl LocalHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers every dispatcher starts with: `echo` returns its payload
    pub fn with_builtins() -> Self {
        let mut handlers = Self::new();
        handlers.register("echo", |payload: Value| -> Result<Value> { Ok(payload) });
        handlers
    }

    /// Register or replace the handler for `entry`
    pub fn register(&mut self, entry: impl Into<String>, handler: impl LocalHandler + 'static) {
        self.handlers.insert(entry.into(), Arc::new(handler));
    }

    pub fn get(&self, entry: &str) -> Option<Arc<dyn LocalHandler>> {
        self.handlers.get(entry).cloned()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.handlers.contains_key(entry)
    }

    /// Sorted entry names
    pub fn entries(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolgateError;
    use serde_json::json;

    struct Doubler;

    #[async_trait]
    impl LocalHandler for Doubler {
        async fn call(&self, payload: Value) -> Result<Value> {
            let n = payload["n"]
                .as_i64()
                .ok_or_else(|| ToolgateError::Validation("missing 'n'".to_string()))?;
            Ok(json!({ "n": n * 2 }))
        }
    }

    #[tokio::test]
    async fn test_builtin_echo() {
        let handlers = LocalHandlers::with_builtins();
        let echo = handlers.get("echo").unwrap();
        assert_eq!(echo.call(json!({"a": 1})).await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_struct_handler() {
        let mut handlers = LocalHandlers::new();
        handlers.register("double", Doubler);
        let double = handlers.get("double").unwrap();
        assert_eq!(double.call(json!({"n": 21})).await.unwrap(), json!({"n": 42}));
        assert!(double.call(json!({})).await.is_err());
    }

    #[test]
    fn test_entries_sorted() {
        let mut handlers = LocalHandlers::with_builtins();
        handlers.register("alpha", |v: Value| -> Result<Value> { Ok(v) });
        assert_eq!(handlers.entries(), vec!["alpha", "echo"]);
        assert!(handlers.contains("alpha"));
        assert!(!handlers.contains("missing"));
    }
}
