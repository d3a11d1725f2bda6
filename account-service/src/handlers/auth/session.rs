use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    dtos::account::{LoginRequest, RefreshTokenRequest},
    handlers::generic_error,
    utils::ValidatedJson,
    AppState,
};

/// Login with email and password
///
/// Every rejection carries the same message so the response does not reveal
/// whether the account exists or is verified.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::dtos::account::LoginResponse),
        (status = 400, description = "Malformed request", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Login failed", body = crate::dtos::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Session"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, Response> {
    let res = state
        .account_service
        .login(req)
        .await
        .map_err(|e| generic_error(e, StatusCode::FORBIDDEN, "Login failed"))?;

    Ok((StatusCode::OK, Json(res)))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/users/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = crate::dtos::account::TokenPairResponse),
        (status = 401, description = "Invalid or expired refresh token", body = crate::dtos::ErrorResponse)
    ),
    tag = "Session"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, Response> {
    let res = state
        .account_service
        .refresh_tokens(req)
        .await
        .map_err(|e| generic_error(e, StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;

    Ok((StatusCode::OK, Json(res)))
}
