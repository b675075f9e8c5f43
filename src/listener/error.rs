use thiserror::Error;

use crate::transaction::TransactionError;

/// Listener system errors with structured error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ListenerError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Listener {listener} failed: {message}")]
    ListenerFailed {
        listener: &'static str,
        message: String,
    },

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),
}

impl ListenerError {
    pub fn failed(listener: &'static str, message: impl Into<String>) -> Self {
        ListenerError::ListenerFailed {
            listener,
            message: message.into(),
        }
    }
}

/// Convert from transaction collaborator errors
impl From<TransactionError> for ListenerError {
    fn from(error: TransactionError) -> Self {
        ListenerError::TransactionError(error.to_string())
    }
}
