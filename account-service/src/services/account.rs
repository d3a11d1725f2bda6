use secrecy::Secret;
use std::sync::Arc;

use crate::{
    dtos::account::{
        LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest, RegisterRequest,
        RegisterResponse, ResendCodeRequest, TokenPairResponse, VerifyEmailRequest,
        VerifyEmailResponse,
    },
    models::{AccountResponse, NewAccount},
    services::{
        metrics, AccountStore, EmailProvider, JwtService, ServiceError, VerificationWorkflow,
    },
    utils::{hash_password, verify_password},
};

/// Orchestrates the account use cases over the store, token service,
/// verification workflow and notifier.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    verification: VerificationWorkflow,
}

fn observed<T>(operation: &str, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    let outcome = match &result {
        Ok(_) => "success",
        Err(e) if e.is_upstream() => "error",
        Err(_) => "rejected",
    };
    metrics::record(operation, outcome);
    result
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        verification: VerificationWorkflow,
    ) -> Self {
        Self {
            store,
            email,
            jwt,
            verification,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        observed("register", self.register_inner(req).await)
    }

    async fn register_inner(&self, req: RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        if self.store.find_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let password_hash = hash_password(&Secret::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let pending = self.verification.start();
        let code = pending.code.clone();

        // A concurrent registration that wins the race surfaces here as EmailTaken.
        let account = self
            .store
            .insert(NewAccount {
                email: req.email,
                password_hash,
                first_name: req.first_name,
                last_name: req.last_name,
                verification: pending,
            })
            .await?;

        tracing::info!(user_id = account.id, "User registered");

        if let Err(e) = self
            .email
            .send_verification_code(&account.email, &code, &account.first_name)
            .await
        {
            tracing::warn!(user_id = account.id, error = %e, "Failed to send verification code");
        }

        Ok(RegisterResponse {
            message: "User registered successfully. Please check your email for verification code."
                .to_string(),
            email: account.email,
        })
    }

    #[tracing::instrument(skip_all)]
    pub async fn verify_email(
        &self,
        req: VerifyEmailRequest,
    ) -> Result<VerifyEmailResponse, ServiceError> {
        observed("verify_email", self.verify_email_inner(req).await)
    }

    async fn verify_email_inner(
        &self,
        req: VerifyEmailRequest,
    ) -> Result<VerifyEmailResponse, ServiceError> {
        let account = self
            .store
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;

        self.verification.attempt_verify(&account, &req.code)?;

        // Conditional write: only the first concurrent attempt flips the flag,
        // and only while the code it checked is still the pending one.
        if !self.store.mark_verified(account.id, &req.code).await? {
            let current = self.store.find_by_id(account.id).await?;
            return Err(match current {
                Some(a) if !a.is_verified => ServiceError::CodeMismatch,
                _ => ServiceError::AlreadyVerified,
            });
        }

        tracing::info!(user_id = account.id, "Email verified");

        if let Err(e) = self
            .email
            .send_welcome(&account.email, &account.first_name)
            .await
        {
            tracing::warn!(user_id = account.id, error = %e, "Failed to send welcome email");
        }

        match self.jwt.issue_token_pair(account.id, account.is_admin) {
            Ok(pair) => Ok(VerifyEmailResponse {
                message: "Email verified successfully. You can now log in.".to_string(),
                access_token: Some(pair.access_token),
                refresh_token: Some(pair.refresh_token),
            }),
            Err(e) => {
                tracing::error!(user_id = account.id, error = %e, "Failed to issue tokens after verification");
                Ok(VerifyEmailResponse {
                    message: "Email verified successfully".to_string(),
                    access_token: None,
                    refresh_token: None,
                })
            }
        }
    }

    /// Rotate the pending code and send it. Unlike registration, a delivery
    /// failure fails the call.
    #[tracing::instrument(skip_all)]
    pub async fn resend_verification_code(
        &self,
        req: ResendCodeRequest,
    ) -> Result<MessageResponse, ServiceError> {
        observed("resend_code", self.resend_inner(req).await)
    }

    async fn resend_inner(&self, req: ResendCodeRequest) -> Result<MessageResponse, ServiceError> {
        let account = self
            .store
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;

        let pending = self.verification.resend(&account)?;

        if !self
            .store
            .update_verification_code(account.id, &pending)
            .await?
        {
            return Err(ServiceError::AlreadyVerified);
        }

        self.email
            .send_verification_code(&account.email, &pending.code, &account.first_name)
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        tracing::info!(user_id = account.id, "Verification code resent");

        Ok(MessageResponse {
            message: "Verification code sent successfully".to_string(),
        })
    }

    #[tracing::instrument(skip_all)]
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        observed("login", self.login_inner(req).await)
    }

    async fn login_inner(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let account = self
            .store
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;

        if !account.is_verified {
            return Err(ServiceError::NotVerified);
        }

        let valid = verify_password(&Secret::new(req.password), &account.password_hash)
            .map_err(ServiceError::Internal)?;
        if !valid {
            return Err(ServiceError::InvalidCredentials);
        }

        let pair = self.jwt.issue_token_pair(account.id, account.is_admin)?;

        tracing::info!(user_id = account.id, "User logged in");

        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            first_name: account.first_name,
            last_name: account.last_name,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_account(&self, id: i64) -> Result<AccountResponse, ServiceError> {
        observed("get_account", self.get_account_inner(id).await)
    }

    async fn get_account_inner(&self, id: i64) -> Result<AccountResponse, ServiceError> {
        let account = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;
        Ok(account.sanitized())
    }

    #[tracing::instrument(skip(self))]
    pub async fn promote_to_admin(&self, id: i64) -> Result<MessageResponse, ServiceError> {
        observed("promote_admin", self.promote_inner(id).await)
    }

    async fn promote_inner(&self, id: i64) -> Result<MessageResponse, ServiceError> {
        if !self.store.promote_to_admin(id).await? {
            return Err(ServiceError::AccountNotFound);
        }
        tracing::info!(user_id = id, "User promoted to admin");
        Ok(MessageResponse {
            message: "User promoted to admin successfully".to_string(),
        })
    }

    /// Existing claims only: a promotion takes effect on the next login.
    #[tracing::instrument(skip_all)]
    pub async fn refresh_tokens(
        &self,
        req: RefreshTokenRequest,
    ) -> Result<TokenPairResponse, ServiceError> {
        let result = self
            .jwt
            .refresh(&req.refresh_token)
            .map(|pair| TokenPairResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            })
            .map_err(ServiceError::from);
        observed("refresh_token", result)
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        self.store.health_check().await.map_err(ServiceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::models::{Account, PendingVerification};
    use crate::services::{
        Clock, FixedCodeGenerator, InMemoryAccountStore, ManualClock, MockEmailService,
        SentEmail, StoreError, TokenError,
    };
    use chrono::Duration;

    struct Harness {
        service: AccountService,
        store: Arc<InMemoryAccountStore>,
        email: Arc<MockEmailService>,
        clock: Arc<ManualClock>,
        jwt: JwtService,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(InMemoryAccountStore::new());
        let email = Arc::new(MockEmailService::new());
        let jwt = JwtService::new(
            &JwtConfig {
                secret: Secret::new("unit-test-secret".to_string()),
                ..JwtConfig::default()
            },
            clock.clone(),
        )
        .unwrap();
        let verification = VerificationWorkflow::new(
            clock.clone(),
            Arc::new(FixedCodeGenerator("123456".to_string())),
            15,
        );
        let service = AccountService::new(store.clone(), email.clone(), jwt.clone(), verification);

        Harness {
            service,
            store,
            email,
            clock,
            jwt,
        }
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter22".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    fn verify_req(email: &str, code: &str) -> VerifyEmailRequest {
        VerifyEmailRequest {
            email: email.to_string(),
            code: code.to_string(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_creates_unverified_account_with_pending_code() {
        let h = harness();
        let resp = h.service.register(register_req("ada@example.com")).await.unwrap();
        assert_eq!(resp.email, "ada@example.com");

        let account = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(!account.is_verified);
        assert!(!account.is_admin);
        assert_ne!(account.password_hash, "hunter22");

        let pending = account.verification.unwrap();
        assert_eq!(pending.code, "123456");
        assert_eq!(pending.expires_at, h.clock.now() + Duration::minutes(15));
        assert_eq!(h.email.last_code_for("ada@example.com").as_deref(), Some("123456"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_without_write() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();

        let err = h.service.register(register_req("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken));
        assert_eq!(h.email.sent().len(), 1);
    }

    #[tokio::test]
    async fn register_succeeds_when_notification_fails() {
        let h = harness();
        h.email.set_failing(true);

        assert!(h.service.register(register_req("ada@example.com")).await.is_ok());
        assert!(h.store.find_by_email("ada@example.com").await.unwrap().is_some());
    }

    /// Rotates the pending code right before the verify write lands.
    struct RotatingStore {
        inner: InMemoryAccountStore,
        clock: Arc<ManualClock>,
    }

    #[async_trait::async_trait]
    impl AccountStore for RotatingStore {
        async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
            self.inner.find_by_email(email).await
        }

        async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
            self.inner.insert(account).await
        }

        async fn mark_verified(&self, id: i64, code: &str) -> Result<bool, StoreError> {
            let fresh = PendingVerification {
                code: "654321".to_string(),
                expires_at: self.clock.now() + Duration::minutes(15),
            };
            self.inner.update_verification_code(id, &fresh).await?;
            self.inner.mark_verified(id, code).await
        }

        async fn update_verification_code(
            &self,
            id: i64,
            verification: &PendingVerification,
        ) -> Result<bool, StoreError> {
            self.inner.update_verification_code(id, verification).await
        }

        async fn promote_to_admin(&self, id: i64) -> Result<bool, StoreError> {
            self.inner.promote_to_admin(id).await
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            self.inner.health_check().await
        }
    }

    #[tokio::test]
    async fn code_rotated_mid_verify_is_a_mismatch() {
        let h = harness();
        let store = Arc::new(RotatingStore {
            inner: InMemoryAccountStore::new(),
            clock: h.clock.clone(),
        });
        let verification = VerificationWorkflow::new(
            h.clock.clone(),
            Arc::new(FixedCodeGenerator("123456".to_string())),
            15,
        );
        let service =
            AccountService::new(store.clone(), h.email.clone(), h.jwt.clone(), verification);
        service.register(register_req("ada@example.com")).await.unwrap();

        let err = service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CodeMismatch));

        let account = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(!account.is_verified);
        assert_eq!(account.verification.unwrap().code, "654321");
    }

    #[tokio::test]
    async fn verify_then_repeat_reports_already_verified() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();

        let resp = h
            .service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .unwrap();
        let access = resp.access_token.unwrap();
        let claims = h.jwt.validate_access_token(&access).unwrap();
        assert!(!claims.is_admin);
        assert!(resp.refresh_token.is_some());

        let account = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(account.is_verified);
        assert!(account.verification.is_none());
        assert!(h
            .email
            .sent()
            .contains(&SentEmail::Welcome { to: "ada@example.com".to_string() }));

        let err = h
            .service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyVerified));
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();
        h.clock.advance(Duration::minutes(15) + Duration::seconds(1));

        let err = h
            .service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CodeExpired));
    }

    #[tokio::test]
    async fn wrong_code_and_unknown_email() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();

        assert!(matches!(
            h.service.verify_email(verify_req("ada@example.com", "654321")).await,
            Err(ServiceError::CodeMismatch)
        ));
        assert!(matches!(
            h.service.verify_email(verify_req("bob@example.com", "123456")).await,
            Err(ServiceError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn resend_rotates_expiry_and_surfaces_delivery_failure() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();
        h.clock.advance(Duration::minutes(30));

        h.service
            .resend_verification_code(ResendCodeRequest {
                email: "ada@example.com".to_string(),
            })
            .await
            .unwrap();

        let account = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(
            account.verification.unwrap().expires_at,
            h.clock.now() + Duration::minutes(15)
        );
        assert!(h
            .service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .is_ok());

        h.service.register(register_req("bob@example.com")).await.unwrap();
        h.email.set_failing(true);
        let err = h
            .service
            .resend_verification_code(ResendCodeRequest {
                email: "bob@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Notification(_)));
    }

    #[tokio::test]
    async fn resend_for_verified_account_is_rejected() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();
        h.service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .unwrap();

        let err = h
            .service
            .resend_verification_code(ResendCodeRequest {
                email: "ada@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyVerified));
    }

    #[tokio::test]
    async fn login_requires_verification_before_password() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();

        assert!(matches!(
            h.service.login(login_req("ada@example.com", "hunter22")).await,
            Err(ServiceError::NotVerified)
        ));
        assert!(matches!(
            h.service.login(login_req("ada@example.com", "wrong")).await,
            Err(ServiceError::NotVerified)
        ));
    }

    #[tokio::test]
    async fn login_after_verification() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();
        h.service
            .verify_email(verify_req("ada@example.com", "123456"))
            .await
            .unwrap();

        assert!(matches!(
            h.service.login(login_req("ada@example.com", "wrong")).await,
            Err(ServiceError::InvalidCredentials)
        ));

        let resp = h
            .service
            .login(login_req("ada@example.com", "hunter22"))
            .await
            .unwrap();
        assert_eq!(resp.first_name, "Ada");
        assert_eq!(resp.last_name, "Lovelace");
        assert!(h.jwt.validate_refresh_token(&resp.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn promote_missing_account_changes_nothing() {
        let h = harness();
        h.service.register(register_req("ada@example.com")).await.unwrap();

        assert!(matches!(
            h.service.promote_to_admin(999).await,
            Err(ServiceError::AccountNotFound)
        ));
        let account = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(!account.is_admin);

        h.service.promote_to_admin(account.id).await.unwrap();
        h.service.promote_to_admin(account.id).await.unwrap();
        assert!(h.service.get_account(account.id).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let h = harness();
        let pair = h.jwt.issue_token_pair(1, false).unwrap();

        let err = h
            .service
            .refresh_tokens(RefreshTokenRequest {
                refresh_token: pair.access_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Unauthorized(TokenError::WrongSubject)
        ));

        assert!(h
            .service
            .refresh_tokens(RefreshTokenRequest {
                refresh_token: pair.refresh_token,
            })
            .await
            .is_ok());
    }
}
