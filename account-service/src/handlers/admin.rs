use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    dtos::account::{MessageResponse, PromoteRequest},
    handlers::client_error,
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Succeeds only when the bearer token is a valid admin access token
#[utoipa::path(
    get,
    path = "/users/admin",
    responses(
        (status = 200, description = "Token grants admin access", body = MessageResponse),
        (status = 401, description = "Missing, invalid, or non-admin token", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn verify_admin_token(AuthUser(claims): AuthUser) -> impl IntoResponse {
    tracing::debug!(user_id = %claims.jti, "Admin token verified");
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Admin token is valid".to_string(),
        }),
    )
}

/// Grant admin rights to an account
#[utoipa::path(
    post,
    path = "/users/promote-admin",
    request_body = PromoteRequest,
    responses(
        (status = 200, description = "User promoted", body = MessageResponse),
        (status = 401, description = "Missing, invalid, or non-admin token", body = crate::dtos::ErrorResponse),
        (status = 404, description = "User not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn promote_to_admin(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<PromoteRequest>,
) -> Result<impl IntoResponse, Response> {
    tracing::info!(admin_id = %claims.jti, target_id = req.id, "Admin promotion requested");

    let res = state
        .account_service
        .promote_to_admin(req.id)
        .await
        .map_err(|e| client_error(e, StatusCode::NOT_FOUND))?;

    Ok((StatusCode::OK, Json(res)))
}
