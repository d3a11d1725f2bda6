use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use thiserror::Error;

use crate::models::{Account, NewAccount, PendingVerification};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("Store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

/// Persistence seam for accounts.
///
/// Email lookups are exact and case-sensitive.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert an unverified, non-admin account. Fails with `EmailTaken`
    /// when the email is already present.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Mark the account verified and clear its code, only if it is still
    /// unverified and its pending code is still `code`. Returns whether a
    /// row changed.
    async fn mark_verified(&self, id: i64, code: &str) -> Result<bool, StoreError>;

    /// Replace the pending code of an unverified account. Returns whether a
    /// row changed.
    async fn update_verification_code(
        &self,
        id: i64,
        verification: &PendingVerification,
    ) -> Result<bool, StoreError>;

    /// Set the admin flag. Returns whether the account exists.
    async fn promote_to_admin(&self, id: i64) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Process-local store used by tests and local runs without Postgres.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    accounts: Vec<Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.lock().accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.lock();
        if inner.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::EmailTaken);
        }

        inner.next_id += 1;
        let created = Account {
            id: inner.next_id,
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            is_admin: false,
            is_verified: false,
            verification: Some(account.verification),
            created_at: Utc::now(),
        };
        inner.accounts.push(created.clone());

        Ok(created)
    }

    async fn mark_verified(&self, id: i64, code: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.accounts.iter_mut().find(|a| {
            a.id == id
                && !a.is_verified
                && a.verification.as_ref().is_some_and(|v| v.code == code)
        }) {
            Some(account) => {
                account.is_verified = true;
                account.verification = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_verification_code(
        &self,
        id: i64,
        verification: &PendingVerification,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner
            .accounts
            .iter_mut()
            .find(|a| a.id == id && !a.is_verified)
        {
            Some(account) => {
                account.verification = Some(verification.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn promote_to_admin(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.is_admin = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
