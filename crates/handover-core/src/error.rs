use crate::types::HandlerKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no handler registered for '{0}': add it under `handlers` in .handover/config.yaml")]
    HandlerNotRegistered(HandlerKey),

    #[error("unknown handler '{0}': expected one of pm, architect, developer, qa, security, devops, releasemanager")]
    UnknownHandler(String),

    #[error("handler '{handler}' failed: {reason}")]
    HandlerFailed { handler: HandlerKey, reason: String },

    #[error("invalid {field} value '{value}': must be a non-empty single line without '*', '[' or ']'")]
    InvalidFieldValue { field: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Configuration problems are reported differently from runtime failures
    /// by callers that map errors to exit codes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WorkflowError::HandlerNotRegistered(_) | WorkflowError::UnknownHandler(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
