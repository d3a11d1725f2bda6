//! Test helper module for account-service integration tests.
//!
//! Drives the real router over an in-memory store, a manual clock, a fixed
//! verification code and a recording mailer.

#![allow(dead_code)]

use account_service::{
    build_router,
    config::{
        AccountConfig, DatabaseConfig, Environment, JwtConfig, SecurityConfig, VerificationConfig,
    },
    services::{
        AccountStore, FixedCodeGenerator, InMemoryAccountStore, JwtService, ManualClock,
        MockEmailService,
    },
    AppState,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_CODE: &str = "123456";
pub const TEST_PASSWORD: &str = "hunter22";
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> AccountConfig {
    AccountConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "account-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: Secret::new(String::new()),
            name: "accounts_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_JWT_SECRET.to_string()),
            ..JwtConfig::default()
        },
        verification: VerificationConfig::default(),
        smtp: None,
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryAccountStore>,
    pub email: Arc<MockEmailService>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryAccountStore::new());
        let email = Arc::new(MockEmailService::new());
        let clock = Arc::new(ManualClock::default());

        let state = AppState::new(
            test_config(),
            store.clone(),
            email.clone(),
            clock.clone(),
            Arc::new(FixedCodeGenerator(TEST_CODE.to_string())),
        )
        .expect("Failed to build app state");

        Self {
            router: build_router(state.clone()),
            state,
            store,
            email,
            clock,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.state.jwt
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, body)
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.post_with_token(path, body, None).await
    }

    pub async fn post_with_token(
        &self,
        path: &str,
        body: Value,
        authorization: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, path: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, email: &str) -> (StatusCode, Value) {
        self.post(
            "/users/register",
            json!({
                "email": email,
                "password": TEST_PASSWORD,
                "first_name": "Ada",
                "last_name": "Lovelace"
            }),
        )
        .await
    }

    pub async fn verify(&self, email: &str, code: &str) -> (StatusCode, Value) {
        self.post("/users/verify-email", json!({ "email": email, "code": code }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/users/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register, verify and log in; returns the account ID and login body.
    pub async fn verified_user(&self, email: &str) -> (i64, Value) {
        let (status, _) = self.register(email).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = self.verify(email, TEST_CODE).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self.login(email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);

        let id = self
            .store
            .find_by_email(email)
            .await
            .unwrap()
            .expect("account exists")
            .id;
        (id, body)
    }

    /// Like [`verified_user`](Self::verified_user) but promoted to admin
    /// before logging in, so the tokens carry the admin claim.
    pub async fn admin_user(&self, email: &str) -> (i64, Value) {
        let (id, _) = self.verified_user(email).await;
        assert!(self.store.promote_to_admin(id).await.unwrap());

        let (status, body) = self.login(email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        (id, body)
    }
}

pub fn bearer(token: &Value) -> String {
    format!("Bearer {}", token.as_str().expect("token is a string"))
}
