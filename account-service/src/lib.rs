pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::{error::AppError, middleware::request_id_middleware};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::AccountConfig;
use crate::services::{
    AccountService, AccountStore, Clock, CodeGenerator, EmailProvider, JwtService,
    VerificationWorkflow,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::register,
        handlers::auth::registration::verify_email,
        handlers::auth::registration::resend_code,
        handlers::auth::session::login,
        handlers::auth::session::refresh_token,
        handlers::user::get_account,
        handlers::admin::verify_admin_token,
        handlers::admin::promote_to_admin,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::account::RegisterRequest,
            dtos::account::RegisterResponse,
            dtos::account::VerifyEmailRequest,
            dtos::account::VerifyEmailResponse,
            dtos::account::ResendCodeRequest,
            dtos::account::MessageResponse,
            dtos::account::LoginRequest,
            dtos::account::LoginResponse,
            dtos::account::RefreshTokenRequest,
            dtos::account::TokenPairResponse,
            dtos::account::PromoteRequest,
            models::AccountResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Registration", description = "Sign-up and email verification"),
        (name = "Session", description = "Login and token refresh"),
        (name = "Users", description = "Account lookup"),
        (name = "Admin", description = "Administrative operations"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AccountConfig,
    pub jwt: JwtService,
    pub account_service: AccountService,
}

impl AppState {
    /// Wire the services over the given collaborators.
    pub fn new(
        config: AccountConfig,
        store: Arc<dyn AccountStore>,
        email: Arc<dyn EmailProvider>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt, clock.clone()).map_err(AppError::ConfigError)?;
        let verification =
            VerificationWorkflow::new(clock, codes, config.verification.code_expiry_minutes);
        let account_service = AccountService::new(store, email, jwt.clone(), verification);

        Ok(Self {
            config,
            jwt,
            account_service,
        })
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/users/admin", get(handlers::admin::verify_admin_token))
        .route("/users/promote-admin", post(handlers::admin::promote_to_admin))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    let authenticated_routes = Router::new()
        .route("/users/:id", get(handlers::user::get_account))
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/users/register", post(handlers::auth::register))
        .route("/users/verify-email", post(handlers::auth::verify_email))
        .route("/users/resend-code", post(handlers::auth::resend_code))
        .route("/users/login", post(handlers::auth::login))
        .route("/users/refresh-token", post(handlers::auth::refresh_token))
        .merge(admin_routes)
        .merge(authenticated_routes)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(service_core::middleware::REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Database unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.account_service.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Account store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up"
        }
    })))
}
