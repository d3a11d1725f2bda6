use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    dtos::ErrorResponse,
    handlers::client_error,
    middleware::AuthUser,
    AppState,
};

/// Fetch an account by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = crate::models::AccountResponse),
        (status = 400, description = "Invalid user ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Response> {
    let id: i64 = id.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid user ID".to_string(),
            }),
        )
            .into_response()
    })?;

    let account = state
        .account_service
        .get_account(id)
        .await
        .map_err(|e| client_error(e, StatusCode::NOT_FOUND))?;

    Ok((StatusCode::OK, Json(account)))
}
