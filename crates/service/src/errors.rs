use thiserror::Error;

use models::errors::ModelError;

/// Failure kinds of store operations. Everything except `Persistence` is
/// raised before any state changes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Failure inside the service itself, e.g. password hashing.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: &str) -> Self { Self::NotFound(format!("no such {entity}: {id}")) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 1001,
            ServiceError::Conflict(_) => 1002,
            ServiceError::NotFound(_) => 1003,
            ServiceError::Unauthorized(_) => 1004,
            ServiceError::Persistence(_) => 1200,
            ServiceError::Internal(_) => 1500,
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(msg) => ServiceError::Validation(msg),
            ModelError::Db(msg) => ServiceError::Persistence(msg),
        }
    }
}
