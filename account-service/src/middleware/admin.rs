use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    Json,
};

use crate::{
    dtos::ErrorResponse,
    middleware::auth::{bearer_token, unauthorized},
    AppState,
};

/// Middleware to require an admin access token. Claims are stored in the
/// request extensions for [`AuthUser`](crate::middleware::AuthUser).
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| unauthorized("Token is required"))?;

    let claims = state.jwt.validate_admin_token(token).map_err(|e| {
        tracing::warn!(error = %e, "Failed admin authentication attempt");
        unauthorized("Invalid token")
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
