//! Error types for toolgate
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in toolgate
#[derive(Debug, Error)]
pub enum ToolgateError {
    /// Malformed or out-of-range input to registration or config
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown tool id
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Caller-supplied id already registered
    #[error("Duplicate tool id: {0}")]
    DuplicateId(String),

    /// No tool's capabilities overlap the requirement
    #[error("No capability match: {0}")]
    NoCandidate(String),

    /// Every candidate was disqualified, even after relaxing constraints
    #[error("Constraints unsatisfiable: {0}")]
    ConstraintUnsatisfiable(String),

    /// Tool invocation exceeded its timeout
    #[error("Execution timed out after {0}ms")]
    ExecutionTimeout(u64),

    /// Downstream tool unreachable or failed at the transport level
    #[error("Transport error: {0}")]
    ExecutionTransport(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Required configuration sections absent
    #[error("Missing required config sections: {}", .0.join(", "))]
    MissingConfigSections(Vec<String>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML catalog parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML config parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for toolgate operations
pub type Result<T> = std::result::Result<T, ToolgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ToolgateError::NotFound("web_search".to_string());
        assert_eq!(err.to_string(), "Tool not found: web_search");
    }

    #[test]
    fn test_duplicate_id_error() {
        let err = ToolgateError::DuplicateId("web_search".to_string());
        assert_eq!(err.to_string(), "Duplicate tool id: web_search");
    }

    #[test]
    fn test_validation_error() {
        let err = ToolgateError::Validation("success_rate 1.5 outside [0, 1]".to_string());
        assert_eq!(err.to_string(), "Validation error: success_rate 1.5 outside [0, 1]");
    }

    #[test]
    fn test_execution_timeout_error() {
        let err = ToolgateError::ExecutionTimeout(250);
        assert_eq!(err.to_string(), "Execution timed out after 250ms");
    }

    #[test]
    fn test_missing_sections_lists_every_section() {
        let err = ToolgateError::MissingConfigSections(vec!["agent_core".into(), "adapter_mcp".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required config sections: agent_core, adapter_mcp"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ToolgateError = io_err.into();
        assert!(matches!(err, ToolgateError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ToolgateError = json_err.into();
        assert!(matches!(err, ToolgateError::Json(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid { toml }").unwrap_err();
        let err: ToolgateError = toml_err.into();
        assert!(matches!(err, ToolgateError::Toml(_)));
    }
}
