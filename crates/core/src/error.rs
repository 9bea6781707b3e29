//! Error types for Syllabus.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! generation, retrieval, tool dispatch and prompt errors.

use thiserror::Error;

/// Unified error type for Syllabus.
///
/// All fallible functions return `Result<T, AppError>`.
/// "No results" is not an error: an empty search is a normal outcome and is
/// represented by an empty result set, never by a variant of this enum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM layer errors that are not provider failures (bad request shape, unsupported provider)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Network, authentication or rate-limit failure reported by the generation provider
    #[error("Generation provider error: {0}")]
    GenerationProvider(String),

    /// Knowledge base, index and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// A course hint was given but the catalog index holds no entries
    #[error("No matching course: the course catalog is empty (hint: '{0}')")]
    ResolutionEmpty(String),

    /// A tool was requested by a name that is not registered
    #[error("Tool '{0}' not found")]
    InvalidToolName(String),

    /// Tool parameters failed schema validation
    #[error("Invalid parameters for tool '{tool}': {reason}")]
    InvalidToolParameters { tool: String, reason: String },

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error came from the generation provider and must abort the query.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AppError::GenerationProvider(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tool_name_message() {
        let err = AppError::InvalidToolName("nonexistent_tool".to_string());
        assert_eq!(err.to_string(), "Tool 'nonexistent_tool' not found");
    }

    #[test]
    fn test_invalid_parameters_message() {
        let err = AppError::InvalidToolParameters {
            tool: "search_course_content".to_string(),
            reason: "missing required field 'query'".to_string(),
        };
        assert!(err.to_string().contains("search_course_content"));
        assert!(err.to_string().contains("missing required field"));
    }

    #[test]
    fn test_provider_failure_classification() {
        assert!(AppError::GenerationProvider("timeout".to_string()).is_provider_failure());
        assert!(!AppError::Knowledge("index".to_string()).is_provider_failure());
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
