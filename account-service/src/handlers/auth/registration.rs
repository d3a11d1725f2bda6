use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    dtos::{
        account::{RegisterRequest, ResendCodeRequest, VerifyEmailRequest},
        ErrorResponse,
    },
    handlers::client_error,
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, verification code sent", body = crate::dtos::account::RegisterResponse),
        (status = 400, description = "Validation error or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, Response> {
    let res = state
        .account_service
        .register(req)
        .await
        .map_err(|e| client_error(e, StatusCode::BAD_REQUEST))?;

    Ok((StatusCode::CREATED, Json(res)))
}

/// Verify an email address with the emailed code
#[utoipa::path(
    post,
    path = "/users/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified; tokens included when issued", body = crate::dtos::account::VerifyEmailResponse),
        (status = 400, description = "Unknown email, wrong or expired code, or already verified", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyEmailRequest>,
) -> Result<impl IntoResponse, Response> {
    let res = state
        .account_service
        .verify_email(req)
        .await
        .map_err(|e| client_error(e, StatusCode::BAD_REQUEST))?;

    Ok((StatusCode::OK, Json(res)))
}

/// Send a fresh verification code
#[utoipa::path(
    post,
    path = "/users/resend-code",
    request_body = ResendCodeRequest,
    responses(
        (status = 200, description = "Verification code sent", body = crate::dtos::account::MessageResponse),
        (status = 400, description = "Unknown email, already verified, or email delivery failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn resend_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendCodeRequest>,
) -> Result<impl IntoResponse, Response> {
    let res = state
        .account_service
        .resend_verification_code(req)
        .await
        .map_err(|e| match e {
            ServiceError::Notification(_) => {
                tracing::warn!(error = %e, "Verification code resend not delivered");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "Email delivery failed".to_string(),
                    }),
                )
                    .into_response()
            }
            e => client_error(e, StatusCode::BAD_REQUEST),
        })?;

    Ok((StatusCode::OK, Json(res)))
}
