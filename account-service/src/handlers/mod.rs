//! HTTP handlers for account-service.

pub mod admin;
pub mod auth;
pub mod metrics;
pub mod user;

pub use admin::*;
pub use auth::*;
pub use user::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;

use crate::{dtos::ErrorResponse, services::ServiceError};

/// Render a request-level failure with `status`; infrastructure failures
/// keep their own 5xx mapping.
pub(crate) fn client_error(err: ServiceError, status: StatusCode) -> Response {
    if err.is_upstream() {
        return AppError::from(err).into_response();
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Like [`client_error`] but with a fixed message.
pub(crate) fn generic_error(err: ServiceError, status: StatusCode, message: &str) -> Response {
    if err.is_upstream() {
        return AppError::from(err).into_response();
    }
    tracing::debug!(error = %err, "Request rejected");
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
