use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::{question_source::QuestionSourceError, storage::StorageError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed while reading or writing a record.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client; nothing was mutated.
    #[error("invalid input: {0}")]
    Validation(String),
    /// A pairing could not be turned into a session.
    #[error("pairing failed: {0}")]
    PairingFailed(String),
    /// The question source could not provide a full question set.
    #[error("question source unavailable")]
    QuestionSourceUnavailable(#[source] QuestionSourceError),
    /// The referenced session is missing, undecodable or no longer active.
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),
    /// The submission does not apply to the current round and was ignored.
    #[error("stale submission: {0}")]
    StaleSubmission(String),
}

impl ServiceError {
    /// Whether the connection that triggered the error must be closed.
    pub fn closes_connection(&self) -> bool {
        !matches!(
            self,
            ServiceError::Validation(_) | ServiceError::StaleSubmission(_)
        )
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<QuestionSourceError> for ServiceError {
    fn from(err: QuestionSourceError) -> Self {
        ServiceError::QuestionSourceUnavailable(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::Validation(format!("validation failed: {}", err))
    }
}
