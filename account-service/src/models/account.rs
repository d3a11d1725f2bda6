//! Account model - the persisted identity record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A verification code awaiting confirmation, with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Account entity.
///
/// `verification` is `Some` exactly while the account is unverified and a
/// code is outstanding.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub verification: Option<PendingVerification>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Convert to the public projection (no hash, no code).
    pub fn sanitized(&self) -> AccountResponse {
        AccountResponse::from(self)
    }
}

/// Raw `accounts` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        // A half-populated pair is treated as no pending code.
        let verification = match (row.verification_code, row.code_expires_at) {
            (Some(code), Some(expires_at)) if !row.is_verified => {
                Some(PendingVerification { code, expires_at })
            }
            _ => None,
        };

        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            is_admin: row.is_admin,
            is_verified: row.is_verified,
            verification,
            created_at: row.created_at,
        }
    }
}

/// Fields needed to create an account; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub verification: PendingVerification,
}

/// Account response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountResponse {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            email: a.email.clone(),
            first_name: a.first_name.clone(),
            last_name: a.last_name.clone(),
            is_admin: a.is_admin,
            is_verified: a.is_verified,
            created_at: a.created_at,
        }
    }
}
