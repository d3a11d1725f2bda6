use service_core::error::AppError;
use thiserror::Error;

use crate::services::{StoreError, TokenError, VerificationError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found")]
    AccountNotFound,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Email not verified")]
    NotVerified,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(#[from] TokenError),

    #[error("Invalid verification code")]
    CodeMismatch,

    #[error("Verification code has expired")]
    CodeExpired,

    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Infrastructure failures, as opposed to problems with the request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ServiceError::Store(_) | ServiceError::Notification(_) | ServiceError::Internal(_)
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => ServiceError::EmailTaken,
            StoreError::Unavailable(e) => ServiceError::Store(e),
        }
    }
}

impl From<VerificationError> for ServiceError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::AlreadyVerified => ServiceError::AlreadyVerified,
            VerificationError::CodeMismatch => ServiceError::CodeMismatch,
            VerificationError::CodeExpired => ServiceError::CodeExpired,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::AccountNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::EmailTaken => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::AlreadyVerified => {
                AppError::Conflict(anyhow::anyhow!("Email already verified"))
            }
            ServiceError::NotVerified => AppError::Forbidden(anyhow::anyhow!("Email not verified")),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::Unauthorized(e) => AppError::Unauthorized(anyhow::anyhow!(e)),
            ServiceError::CodeMismatch => {
                AppError::BadRequest(anyhow::anyhow!("Invalid verification code"))
            }
            ServiceError::CodeExpired => {
                AppError::BadRequest(anyhow::anyhow!("Verification code has expired"))
            }
            ServiceError::Store(e) => AppError::DatabaseError(e),
            ServiceError::Notification(e) => AppError::EmailError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
