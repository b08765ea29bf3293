use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue entry not found: {0}")]
    NotFound(Uuid),

    #[error("Queue entry {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("No eligible waiting entry in queue")]
    EmptyQueue,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Queue store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        let message = err.to_string();
        match err {
            QueueError::NotFound(_) => AppError::NotFound(message),
            QueueError::Conflict(_) => AppError::Conflict(message),
            QueueError::InvalidOperation(_) => AppError::BadRequest(message),
            // An empty queue is a state conflict, not a missing resource.
            QueueError::EmptyQueue => AppError::Conflict(message),
            QueueError::Validation(_) => AppError::ValidationError(message),
            QueueError::StoreUnavailable(_) => AppError::ServiceUnavailable(message),
        }
    }
}
