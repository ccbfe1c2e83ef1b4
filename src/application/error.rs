use thiserror::Error;

use crate::domain::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing idempotency token: the X-Request-ID header is required")]
    MissingRequestId,

    #[error("Invalid expense: {0}")]
    Validation(ValidationErrors),

    #[error("Expense total exceeds the largest representable amount")]
    TotalOverflow,

    #[error("Storage unavailable: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// The request itself was wrong; retrying it unchanged will fail again.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::MissingRequestId | AppError::Validation(_))
    }

    /// The caller may retry the same request (with the same request id).
    /// A total overflow is deterministic and never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}
