//! Error types used across ComposeDB.

use thiserror::Error;

/// Result type for ComposeDB operations.
pub type ComposeDbResult<T> = Result<T, ComposeDbError>;

#[derive(Debug, Error)]
pub enum ComposeDbError {
    /// Descriptor could not be parsed or is structurally invalid.
    #[error("malformed descriptor {path}: {reason}")]
    MalformedDescriptor { path: String, reason: String },

    /// No descriptor discoverable, or an explicit path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("service '{service}' not found in project '{project}'")]
    ServiceNotFound { service: String, project: String },

    /// No adapter registered for the requested engine type.
    #[error("no adapter registered for type '{requested}' (registered: {})", registered.join(", "))]
    UnknownAdapter {
        requested: String,
        registered: Vec<String>,
    },

    /// Query text refused by the injection validator.
    #[error("query rejected: {0}")]
    ValidationRejected(String),

    #[error("snapshot for service '{service}' did not complete after {attempts} attempts")]
    BackupTimeout { service: String, attempts: u32 },

    /// Command executor or the command itself failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

// Implement From for common error types to enable `?` operator
impl From<std::io::Error> for ComposeDbError {
    fn from(err: std::io::Error) -> Self {
        ComposeDbError::Internal(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for ComposeDbError {
    fn from(err: serde_json::Error) -> Self {
        ComposeDbError::Internal(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ComposeDbError {
    fn from(err: serde_yaml::Error) -> Self {
        ComposeDbError::Internal(format!("YAML error: {}", err))
    }
}

impl From<String> for ComposeDbError {
    fn from(err: String) -> Self {
        ComposeDbError::Internal(err)
    }
}

impl From<&str> for ComposeDbError {
    fn from(err: &str) -> Self {
        ComposeDbError::Internal(err.to_string())
    }
}
